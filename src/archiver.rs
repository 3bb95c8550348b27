//! The pipeline driver: one pass over the input directory.
//!
//! Each scanned image walks this state machine and stops at the first
//! terminal state:
//!
//! ```text
//! Scanned ─▶ decoded + preprocessed ─┬─▶ NoQrCode                (image kept)
//!                                    └─▶ per payload ─┬─▶ token error, next payload
//!                                                     └─▶ metadata ─┬─▶ Duplicate (image deleted)
//!                                                                   └─▶ Archived  (image deleted, PDF written)
//! all payloads rejected ─▶ DecodeFailed (image kept)
//! ```
//!
//! The first payload that decodes to metadata settles the image: once it has
//! been archived or found to be a duplicate the source file is gone, so later
//! payloads on the same scan are not consulted.
//!
//! Failures are values, not early returns: every stage reports a tagged
//! result and nothing short of a configuration error stops the batch. Panics
//! inside third-party decoders are caught at the image boundary as well.

use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, ImageError};
use crate::output::{ImageOutcome, ImageReport, RunSummary};
use crate::pipeline::decode::{FileImageDecoder, ImageDecoder};
use crate::pipeline::qr::{BarcodeReader, QrReader};
use crate::pipeline::sanitize::ArchiveTarget;
use crate::pipeline::store::{archive_image, PdfWriter, PdfiumWriter};
use crate::pipeline::token::{decode_payload, JwtParser, TokenParser};
use crate::pipeline::{preprocess, scan};
use crate::progress::ProgressCallback;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The four external capabilities the driver depends on.
///
/// [`Components::standard`] wires up the production implementations; tests
/// and embedders can substitute any of them.
pub struct Components {
    pub decoder: Box<dyn ImageDecoder>,
    pub reader: Box<dyn BarcodeReader>,
    pub parser: Box<dyn TokenParser>,
    pub writer: Box<dyn PdfWriter>,
}

impl Components {
    /// `image` decoding, `rqrr` QR reading, `jsonwebtoken` parsing with the
    /// configured verification mode, pdfium PDF output.
    ///
    /// # Errors
    /// [`ArchiveError::PdfEngineUnavailable`] when pdfium cannot be loaded.
    pub fn standard(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        Ok(Self {
            decoder: Box::new(FileImageDecoder),
            reader: Box::new(QrReader),
            parser: Box::new(JwtParser::new(config.verification.clone())),
            writer: Box::new(PdfiumWriter::new()?),
        })
    }
}

/// Archives the invoice images of one input directory.
///
/// # Example
/// ```rust,no_run
/// use invoice_archiver::{ArchiveConfig, Archiver};
///
/// let config = ArchiveConfig::builder()
///     .input_directory("/srv/scans/in")
///     .save_directory("/srv/scans/archive")
///     .build();
/// let summary = Archiver::new(config)?.run()?;
/// println!("{} archived, {} left for review", summary.archived, summary.retained());
/// # Ok::<(), invoice_archiver::ArchiveError>(())
/// ```
pub struct Archiver {
    config: ArchiveConfig,
    components: Components,
}

impl Archiver {
    /// Validate the directories, then load the standard components.
    pub fn new(config: ArchiveConfig) -> Result<Self, ArchiveError> {
        config.validate()?;
        let components = Components::standard(&config)?;
        Ok(Self::with_components(config, components))
    }

    pub fn with_components(config: ArchiveConfig, components: Components) -> Self {
        Self { config, components }
    }

    /// Attach progress events after construction, once the configuration is
    /// known to be usable.
    pub fn with_progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Process every image currently in the input directory.
    ///
    /// # Errors
    /// Only configuration-level problems are returned as `Err`; per-image
    /// failures are recorded in the [`RunSummary`].
    pub fn run(&self) -> Result<RunSummary, ArchiveError> {
        let start = Instant::now();

        if let Err(e) = self.config.validate() {
            error!("Error: {}", e);
            return Err(e);
        }
        let images = scan::list_images(&self.config.input_directory, &self.config.image_extension)
            .inspect_err(|e| error!("Error: {}", e))?;

        let total = images.len();
        info!(
            "Found {} image(s) in '{}'",
            total,
            self.config.input_directory.display()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(total);
        }

        let mut summary = RunSummary {
            scanned: total,
            ..Default::default()
        };

        for (i, path) in images.iter().enumerate() {
            let index = i + 1;
            let name = file_name(path);
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_image_start(index, total, &name);
            }

            let image_start = Instant::now();
            let outcome = self.process_image_isolated(path);
            let report = ImageReport {
                image: path.clone(),
                outcome,
                duration_ms: image_start.elapsed().as_millis() as u64,
            };
            debug!("'{}' → {} in {}ms", name, report.outcome.label(), report.duration_ms);

            if let Some(ref cb) = self.config.progress_callback {
                cb.on_image_complete(index, total, &report);
            }
            summary.record(report);
        }

        summary.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Run complete: {} archived, {} duplicate(s), {} without QR code, {} undecodable, {} failed ({}ms)",
            summary.archived,
            summary.duplicates,
            summary.no_qr_code,
            summary.decode_failed,
            summary.failed,
            summary.total_duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(&summary);
        }
        Ok(summary)
    }

    /// Run one image through decode → preprocess → QR → token → archive.
    pub fn process_image(&self, path: &Path) -> ImageOutcome {
        let name = file_name(path);

        let image = match self.components.decoder.decode(path) {
            Ok(image) => image,
            Err(detail) => {
                let error = ImageError::Unreadable {
                    path: path.to_path_buf(),
                    detail,
                };
                warn!("Error: {}", error);
                return ImageOutcome::Failed { error };
            }
        };

        let Some(frame) = preprocess::preprocess(&image) else {
            return ImageOutcome::Failed {
                error: ImageError::Preprocess {
                    path: path.to_path_buf(),
                    detail: "no frame produced".into(),
                },
            };
        };
        let payloads = self.components.reader.read(&frame);
        drop(frame);

        if payloads.is_empty() {
            info!("No QR code detected in the image '{}'", name);
            return ImageOutcome::NoQrCode;
        }
        debug!("'{}' holds {} QR payload(s)", name, payloads.len());

        let mut errors = Vec::new();
        for payload in &payloads {
            let metadata = match decode_payload(self.components.parser.as_ref(), payload) {
                Ok(metadata) => metadata,
                Err(e) => {
                    info!("{}", e);
                    errors.push(e);
                    continue;
                }
            };

            let target = ArchiveTarget::new(&self.config.save_directory, &metadata);
            return match archive_image(
                path,
                &image,
                &target,
                &self.config.save_directory,
                self.components.writer.as_ref(),
            ) {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!("Error: {}", error);
                    ImageOutcome::Failed { error }
                }
            };
        }

        info!("Image '{}' left in place: no usable QR payload", name);
        ImageOutcome::DecodeFailed { errors }
    }

    /// [`Archiver::process_image`], with panics turned into a failed outcome.
    fn process_image_isolated(&self, path: &Path) -> ImageOutcome {
        panic::catch_unwind(AssertUnwindSafe(|| self.process_image(path))).unwrap_or_else(
            |payload| {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let error = ImageError::Internal { detail };
                warn!("Error processing '{}': {}", path.display(), error);
                ImageOutcome::Failed { error }
            },
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
