//! Directory scanning: list the invoice images waiting in the input directory.
//!
//! The listing is a snapshot. Files dropped into the directory while the run
//! is in progress are picked up by the next run, not this one.

use crate::error::ArchiveError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List regular files directly inside `input_dir` whose names end with
/// `extension`, in directory-listing order.
///
/// The match is a case-sensitive suffix test on the file name; the contents
/// are not inspected. Subdirectories are not descended into.
///
/// # Errors
/// Fatal for the run when `input_dir` is empty, does not exist, or cannot be
/// listed.
pub fn list_images(input_dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ArchiveError> {
    if input_dir.as_os_str().is_empty() {
        return Err(ArchiveError::InputDirectoryUnset);
    }
    if !input_dir.exists() {
        return Err(ArchiveError::InputDirectoryMissing {
            path: input_dir.to_path_buf(),
        });
    }

    let unreadable = |e| ArchiveError::InputDirectoryUnreadable {
        path: input_dir.to_path_buf(),
        source: e,
    };

    let mut images = Vec::new();
    for entry in std::fs::read_dir(input_dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            debug!("Skipping non-UTF-8 file name {:?}", name);
            continue;
        };
        if !name.ends_with(extension) {
            continue;
        }
        // Follows symlinks, so a link to an image still counts.
        if !entry.path().is_file() {
            continue;
        }
        images.push(entry.path());
    }

    debug!(
        "Found {} '{}' files in {}",
        images.len(),
        extension,
        input_dir.display()
    );
    Ok(images)
}
