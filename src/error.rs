//! Error types for the invoice-archiver library.
//!
//! Three error types map to the three scopes a failure can have:
//!
//! * [`ArchiveError`] (**fatal**): the run cannot start (settings missing,
//!   input directory unset or absent, PDF engine not loadable). Returned as
//!   `Err(ArchiveError)` from [`crate::Archiver::run`] and the settings loader.
//!
//! * [`ImageError`] (**non-fatal, one image**): the image could not be read,
//!   or its PDF could not be written. Stored in
//!   [`crate::output::ImageOutcome::Failed`]; the batch carries on.
//!
//! * [`TokenError`] (**non-fatal, one QR payload**): the payload was not a
//!   usable invoice token. The driver moves on to the image's next payload and
//!   leaves the source image in place for manual inspection.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice-archiver library.
#[derive(Debug, Error)]
pub enum ArchiveError {
    // ── Settings errors ───────────────────────────────────────────────────
    /// The settings file exists but could not be read.
    #[error("Failed to read configuration file '{path}': {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has the wrong shape.
    #[error("Configuration file '{path}' is invalid: {detail}")]
    SettingsParse { path: PathBuf, detail: String },

    /// The default settings file could not be created.
    #[error("Failed to create configuration file '{path}': {source}")]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Directory errors ──────────────────────────────────────────────────
    /// `input_directory` is empty.
    #[error("Input directory path is empty or invalid.\nSet input_directory in the configuration file.")]
    InputDirectoryUnset,

    /// `input_directory` points at nothing.
    #[error("Input directory '{path}' does not exist.")]
    InputDirectoryMissing { path: PathBuf },

    /// `input_directory` exists but could not be listed.
    #[error("Failed to list input directory '{path}': {source}")]
    InputDirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `save_directory` is empty.
    #[error("Save directory path is empty or invalid.\nSet save_directory in the configuration file.")]
    SaveDirectoryUnset,

    // ── PDF engine errors ─────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the executable, install it system-wide, or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfEngineUnavailable(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single source image.
///
/// The source image is never deleted when one of these is reported, except
/// for [`ImageError::RemoveSource`] where the PDF was written but the delete
/// itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ImageError {
    /// The file could not be decoded as an image.
    #[error("Unable to load the image from '{path}': {detail}")]
    Unreadable { path: PathBuf, detail: String },

    /// Preprocessing produced no frame to scan.
    #[error("Image preprocessing failed for '{path}': {detail}")]
    Preprocess { path: PathBuf, detail: String },

    /// The save directory could not be created.
    #[error("Failed to create save directory '{path}': {detail}")]
    CreateSaveDirectory { path: PathBuf, detail: String },

    /// Rendering or writing the PDF failed; the source image was kept.
    #[error("Failed to write PDF '{path}': {detail}")]
    PdfWrite { path: PathBuf, detail: String },

    /// The source image could not be deleted after archival or duplicate detection.
    #[error("Failed to delete image '{path}': {detail}")]
    RemoveSource { path: PathBuf, detail: String },

    /// A decoder panicked while handling this image.
    #[error("An error occurred while decoding QR code: {detail}")]
    Internal { detail: String },
}

/// Why one decoded QR payload could not be turned into invoice metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TokenError {
    /// The payload bytes are not UTF-8 text.
    #[error("An error occurred while processing QR code data: payload is not valid UTF-8 ({0})")]
    NotUtf8(String),

    /// The payload is not a well-formed signed token.
    #[error("Failed to decode token: {0}. Reason: Invalid or corrupted QR code data.")]
    InvalidToken(String),

    /// Signature verification is enabled and the signature did not match.
    #[error("Failed to verify token signature: {0}. Reason: The QR code was not signed with the configured secret.")]
    SignatureRejected(String),

    /// The claim set has no `data` field.
    #[error("An error occurred while processing QR code data: token has no 'data' claim")]
    MissingData,

    /// The `data` claim is present but is not a string.
    #[error("An error occurred while processing QR code data: 'data' claim is {0}, expected a JSON string")]
    DataNotString(String),

    /// The `data` claim is not valid JSON.
    #[error("Failed to decode JSON data: {0}. Reason: The decoded QR code data might not be in valid JSON format.")]
    InvalidJson(String),

    /// The `data` claim is valid JSON but not an object.
    #[error("An error occurred while processing QR code data: embedded JSON is {0}, expected an object")]
    DataNotObject(String),

    /// `DocNo` or `DocDt` is present but not a string.
    #[error("An error occurred while processing QR code data: field '{field}' is {kind}, expected a string")]
    FieldNotString { field: String, kind: String },
}

impl TokenError {
    /// True for the two failure kinds the console names specifically
    /// (corrupted token, malformed JSON); false for the generic bucket.
    pub fn is_format_error(&self) -> bool {
        matches!(self, TokenError::InvalidToken(_) | TokenError::InvalidJson(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_token_display() {
        let e = TokenError::InvalidToken("InvalidToken".into());
        let msg = e.to_string();
        assert!(msg.starts_with("Failed to decode token"), "got: {msg}");
        assert!(msg.contains("Invalid or corrupted QR code data"));
    }

    #[test]
    fn invalid_json_display() {
        let e = TokenError::InvalidJson("expected value at line 1 column 1".into());
        let msg = e.to_string();
        assert!(msg.starts_with("Failed to decode JSON data"), "got: {msg}");
        assert!(msg.contains("line 1 column 1"));
    }

    #[test]
    fn generic_token_errors_share_prefix() {
        for e in [
            TokenError::MissingData,
            TokenError::DataNotString("a number".into()),
            TokenError::NotUtf8("invalid utf-8 sequence".into()),
        ] {
            assert!(
                e.to_string()
                    .starts_with("An error occurred while processing QR code data"),
                "got: {e}"
            );
            assert!(!e.is_format_error());
        }
    }

    #[test]
    fn input_directory_missing_display() {
        let e = ArchiveError::InputDirectoryMissing {
            path: PathBuf::from("/scans/in"),
        };
        assert!(e.to_string().contains("/scans/in"));
        assert!(e.to_string().contains("does not exist"));
    }

    #[test]
    fn image_error_roundtrips_through_json() {
        let e = ImageError::PdfWrite {
            path: PathBuf::from("out/INV1_2024.pdf"),
            detail: "disk full".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: ImageError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
