//! # invoice-archiver
//!
//! File scanned invoices as PDFs named after the invoice they contain.
//!
//! Invoices issued through e-invoicing portals carry a QR code holding a
//! signed token; the token's `data` claim is a JSON document with the invoice
//! number (`DocNo`) and date (`DocDt`). This crate watches an input directory
//! of scanner output, reads that QR code from each image, and files the image
//! as `<DocNo>_<DocDt>.pdf` in a save directory. A scan whose PDF already
//! exists is treated as a duplicate and discarded.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input_directory/*.jpg
//!  │
//!  ├─ 1. Scan        snapshot the image list
//!  ├─ 2. Decode      load the image
//!  ├─ 3. Preprocess  grayscale → 5×5 blur → threshold
//!  ├─ 4. QR          decode every QR symbol
//!  ├─ 5. Token       JWT claims → data JSON → DocNo / DocDt
//!  ├─ 6. Sanitize    <DocNo>_<DocDt>.pdf, reserved chars → '_'
//!  └─ 7. Store       duplicate? delete scan : write PDF, delete scan
//! ```
//!
//! Images without a readable QR code or with an undecodable token stay in
//! the input directory for a human to look at. Nothing but a configuration
//! error stops the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice_archiver::{ArchiveConfig, Archiver};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ArchiveConfig::builder()
//!         .input_directory("/srv/scans/in")
//!         .save_directory("/srv/scans/archive")
//!         .build();
//!     let summary = Archiver::new(config)?.run()?;
//!     eprintln!("{} archived, {} duplicates", summary.archived, summary.duplicates);
//!     Ok(())
//! }
//! ```
//!
//! ## Token trust
//!
//! By default the token signature is **not** verified
//! ([`TokenVerification::Disabled`]). Set [`TokenVerification::Hs256`] when the
//! issuer's shared secret is available.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice-archiver` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archiver;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archiver::{Archiver, Components};
pub use config::{
    default_settings_path, ArchiveConfig, ArchiveConfigBuilder, DirectorySettings, SettingsFile,
    TokenVerification,
};
pub use error::{ArchiveError, ImageError, TokenError};
pub use output::{ImageOutcome, ImageReport, InvoiceMetadata, RunSummary};
pub use pipeline::decode::{FileImageDecoder, ImageDecoder};
pub use pipeline::qr::{BarcodeReader, QrReader};
pub use pipeline::sanitize::{sanitize_for_filename, ArchiveTarget};
pub use pipeline::store::{PdfWriter, PdfiumWriter};
pub use pipeline::token::{JwtParser, TokenParser};
pub use progress::{ArchiveProgressCallback, NoopProgressCallback, ProgressCallback};
