//! Result types: what a run read out of each invoice and what it did with it.

use crate::error::{ImageError, TokenError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder used when the embedded JSON lacks `DocNo` or `DocDt`.
pub const MISSING_FIELD: &str = "N/A";

/// Invoice fields recovered from a QR token's embedded JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    /// `DocNo`, or [`MISSING_FIELD`].
    pub document_number: String,
    /// `DocDt`, or [`MISSING_FIELD`].
    pub document_date: String,
}

impl Default for InvoiceMetadata {
    fn default() -> Self {
        Self {
            document_number: MISSING_FIELD.to_string(),
            document_date: MISSING_FIELD.to_string(),
        }
    }
}

/// What happened to one source image.
///
/// `Archived` and `Duplicate` delete the source image; every other variant
/// leaves it in the input directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    /// A new PDF was written at `target` and the image deleted.
    Archived { target: PathBuf },
    /// A PDF already existed at `target`; the image was deleted, nothing written.
    Duplicate { target: PathBuf },
    /// No QR symbol could be decoded from the image.
    NoQrCode,
    /// Every decoded payload was rejected by the token decoder.
    DecodeFailed { errors: Vec<TokenError> },
    /// The image could not be processed at all.
    Failed { error: ImageError },
}

impl ImageOutcome {
    /// True when the source image was removed from the input directory.
    pub fn removed_source(&self) -> bool {
        matches!(
            self,
            ImageOutcome::Archived { .. } | ImageOutcome::Duplicate { .. }
        )
    }

    /// Short label for console output.
    pub fn label(&self) -> &'static str {
        match self {
            ImageOutcome::Archived { .. } => "archived",
            ImageOutcome::Duplicate { .. } => "duplicate",
            ImageOutcome::NoQrCode => "no QR code",
            ImageOutcome::DecodeFailed { .. } => "decode failed",
            ImageOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one image plus its timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReport {
    /// Path of the source image as scanned.
    pub image: PathBuf,
    pub outcome: ImageOutcome,
    /// Wall-clock time spent on this image.
    pub duration_ms: u64,
}

/// Aggregate result of one pass over the input directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Images found by the scanner.
    pub scanned: usize,
    pub archived: usize,
    pub duplicates: usize,
    pub no_qr_code: usize,
    pub decode_failed: usize,
    pub failed: usize,
    /// Total wall-clock duration of the run.
    pub total_duration_ms: u64,
    /// One entry per scanned image, in processing order.
    pub images: Vec<ImageReport>,
}

impl RunSummary {
    /// Append a report and bump the matching counter.
    pub fn record(&mut self, report: ImageReport) {
        match report.outcome {
            ImageOutcome::Archived { .. } => self.archived += 1,
            ImageOutcome::Duplicate { .. } => self.duplicates += 1,
            ImageOutcome::NoQrCode => self.no_qr_code += 1,
            ImageOutcome::DecodeFailed { .. } => self.decode_failed += 1,
            ImageOutcome::Failed { .. } => self.failed += 1,
        }
        self.images.push(report);
    }

    /// Images still sitting in the input directory after the run.
    pub fn retained(&self) -> usize {
        self.no_qr_code + self.decode_failed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: ImageOutcome) -> ImageReport {
        ImageReport {
            image: PathBuf::from("in/scan.jpg"),
            outcome,
            duration_ms: 1,
        }
    }

    #[test]
    fn metadata_defaults_to_placeholder() {
        let m = InvoiceMetadata::default();
        assert_eq!(m.document_number, "N/A");
        assert_eq!(m.document_date, "N/A");
    }

    #[test]
    fn summary_counts_each_outcome() {
        let mut s = RunSummary {
            scanned: 5,
            ..Default::default()
        };
        s.record(report(ImageOutcome::Archived {
            target: PathBuf::from("out/a.pdf"),
        }));
        s.record(report(ImageOutcome::Duplicate {
            target: PathBuf::from("out/a.pdf"),
        }));
        s.record(report(ImageOutcome::NoQrCode));
        s.record(report(ImageOutcome::DecodeFailed {
            errors: vec![TokenError::MissingData],
        }));
        s.record(report(ImageOutcome::Failed {
            error: ImageError::Internal {
                detail: "boom".into(),
            },
        }));

        assert_eq!(s.archived, 1);
        assert_eq!(s.duplicates, 1);
        assert_eq!(s.no_qr_code, 1);
        assert_eq!(s.decode_failed, 1);
        assert_eq!(s.failed, 1);
        assert_eq!(s.retained(), 3);
        assert_eq!(s.images.len(), 5);
    }

    #[test]
    fn only_terminal_outcomes_remove_source() {
        assert!(ImageOutcome::Archived {
            target: PathBuf::from("x.pdf")
        }
        .removed_source());
        assert!(ImageOutcome::Duplicate {
            target: PathBuf::from("x.pdf")
        }
        .removed_source());
        assert!(!ImageOutcome::NoQrCode.removed_source());
        assert!(!ImageOutcome::DecodeFailed { errors: vec![] }.removed_source());
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let json = serde_json::to_value(ImageOutcome::NoQrCode).unwrap();
        assert_eq!(json["status"], "no_qr_code");
    }
}
