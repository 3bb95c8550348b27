//! Filename sanitising: map invoice metadata to a safe PDF path.

use crate::output::InvoiceMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Characters that are reserved in Windows file names or are path separators.
static RE_UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).unwrap());

/// Replace each of `/ \ : * ? " < > |` with `_`.
///
/// Nothing else is touched: case, whitespace, dots and length pass through.
pub fn sanitize_for_filename(text: &str) -> String {
    RE_UNSAFE_FILENAME_CHARS.replace_all(text, "_").into_owned()
}

/// Output PDF location derived from invoice metadata.
///
/// The path is the only record of what has been archived: a file existing at
/// [`ArchiveTarget::path`] means this invoice was already processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    file_name: String,
    path: PathBuf,
}

impl ArchiveTarget {
    /// `<save_dir>/<sanitized DocNo>_<sanitized DocDt>.pdf`
    pub fn new(save_dir: &Path, metadata: &InvoiceMetadata) -> Self {
        let file_name = format!(
            "{}_{}.pdf",
            sanitize_for_filename(&metadata.document_number),
            sanitize_for_filename(&metadata.document_date)
        );
        Self {
            path: save_dir.join(&file_name),
            file_name,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
