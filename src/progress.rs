//! Progress-callback trait for per-image archive events.
//!
//! Inject an [`Arc<dyn ArchiveProgressCallback>`] via
//! [`crate::config::ArchiveConfigBuilder::progress_callback`] to receive an
//! event as the driver starts and finishes each image. The CLI uses it to draw
//! a progress bar and one result line per image; library callers can forward
//! the events anywhere without the driver knowing how.
//!
//! # Example
//!
//! ```rust
//! use invoice_archiver::{ArchiveConfig, ArchiveProgressCallback, ImageReport};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ArchivedCounter {
//!     archived: AtomicUsize,
//! }
//!
//! impl ArchiveProgressCallback for ArchivedCounter {
//!     fn on_image_complete(&self, _index: usize, _total: usize, report: &ImageReport) {
//!         if report.outcome.removed_source() {
//!             self.archived.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(ArchivedCounter { archived: AtomicUsize::new(0) });
//!
//! let config = ArchiveConfig::builder()
//!     .input_directory("scans/in")
//!     .save_directory("scans/archive")
//!     .progress_callback(counter as Arc<dyn ArchiveProgressCallback>)
//!     .build();
//! ```

use crate::output::{ImageReport, RunSummary};
use std::sync::Arc;

/// Called by the driver as it works through the scanned images.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait ArchiveProgressCallback: Send + Sync {
    /// Called once after the scan, before any image is opened.
    fn on_run_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called before an image is decoded.
    fn on_image_start(&self, index: usize, total_images: usize, file_name: &str) {
        let _ = (index, total_images, file_name);
    }

    /// Called once the image has reached a terminal outcome.
    fn on_image_complete(&self, index: usize, total_images: usize, report: &ImageReport) {
        let _ = (index, total_images, report);
    }

    /// Called once after every scanned image has been attempted.
    fn on_run_complete(&self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ArchiveProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ArchiveConfig`].
pub type ProgressCallback = Arc<dyn ArchiveProgressCallback>;
