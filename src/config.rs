//! Configuration types for an archive run.
//!
//! Two layers:
//!
//! * [`SettingsFile`] is the operator-edited file on disk holding the two
//!   directory paths. It is created with empty values on first use and read
//!   once at startup.
//! * [`ArchiveConfig`] is what the driver actually consumes, built via
//!   [`ArchiveConfigBuilder`] from the settings file plus any CLI overrides.
//!   It is read-only for the rest of the run.

use crate::error::ArchiveError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Extension a file must end with to be picked up by the scanner.
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

/// Configuration for one pass over the input directory.
///
/// # Example
/// ```rust
/// use invoice_archiver::{ArchiveConfig, TokenVerification};
///
/// let config = ArchiveConfig::builder()
///     .input_directory("/srv/scans/in")
///     .save_directory("/srv/scans/archive")
///     .verification(TokenVerification::Disabled)
///     .build();
/// assert_eq!(config.image_extension, ".jpg");
/// ```
#[derive(Clone, Default)]
pub struct ArchiveConfig {
    /// Directory scanned for invoice images. Empty means unset.
    pub input_directory: PathBuf,

    /// Directory PDFs are written to; created on demand. Empty means unset.
    pub save_directory: PathBuf,

    /// Case-sensitive file-name suffix of images to process. Default: `.jpg`.
    pub image_extension: String,

    /// Whether QR tokens have their signature checked. Default: off.
    pub verification: TokenVerification,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("input_directory", &self.input_directory)
            .field("save_directory", &self.save_directory)
            .field("image_extension", &self.image_extension)
            .field("verification", &self.verification)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ArchiveProgressCallback>"),
            )
            .finish()
    }
}

impl ArchiveConfig {
    /// Create a new builder for `ArchiveConfig`.
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder {
            config: Self {
                image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
                ..Self::default()
            },
        }
    }

    /// Check the directory settings a run cannot start without.
    ///
    /// Order matters for the operator: input unset, input missing, save unset.
    /// The save directory itself may be absent; it is created on first use.
    pub fn validate(&self) -> Result<(), ArchiveError> {
        if self.input_directory.as_os_str().is_empty() {
            return Err(ArchiveError::InputDirectoryUnset);
        }
        if !self.input_directory.exists() {
            return Err(ArchiveError::InputDirectoryMissing {
                path: self.input_directory.clone(),
            });
        }
        if self.save_directory.as_os_str().is_empty() {
            return Err(ArchiveError::SaveDirectoryUnset);
        }
        Ok(())
    }
}

/// Builder for [`ArchiveConfig`].
///
/// Directory paths are not validated here: an empty or missing input
/// directory is a run-time error reported by [`crate::Archiver::run`].
#[derive(Debug)]
pub struct ArchiveConfigBuilder {
    config: ArchiveConfig,
}

impl ArchiveConfigBuilder {
    pub fn input_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_directory = dir.into();
        self
    }

    pub fn save_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.save_directory = dir.into();
        self
    }

    pub fn image_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.image_extension = ext.into();
        self
    }

    pub fn verification(mut self, mode: TokenVerification) -> Self {
        self.config.verification = mode;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Start from the directories in a settings file.
    pub fn settings(self, settings: &SettingsFile) -> Self {
        self.input_directory(&settings.directories.input_directory)
            .save_directory(&settings.directories.save_directory)
    }

    pub fn build(self) -> ArchiveConfig {
        self.config
    }
}

// ── Token verification ───────────────────────────────────────────────────

/// How much the token decoder trusts the signature on a QR token.
///
/// Scanned invoices are issued by a third party whose signing key is normally
/// not available to the archiving site, so the default reads the claims
/// without checking the signature. Anyone able to print a QR code can then
/// choose the archive filename; switch to [`TokenVerification::Hs256`] when
/// the issuer's secret is known.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum TokenVerification {
    /// Read claims without verifying the signature. (default)
    #[default]
    Disabled,
    /// Verify an HMAC-SHA256 signature with this shared secret.
    Hs256 { secret: String },
}

impl fmt::Debug for TokenVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenVerification::Disabled => f.write_str("Disabled"),
            TokenVerification::Hs256 { .. } => f.write_str("Hs256 { secret: <redacted> }"),
        }
    }
}

// ── Settings file ────────────────────────────────────────────────────────

/// The on-disk settings file.
///
/// ```toml
/// [Directories]
/// input_directory = "/srv/scans/in"
/// save_directory = "/srv/scans/archive"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(rename = "Directories", default)]
    pub directories: DirectorySettings,
}

/// The `[Directories]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySettings {
    #[serde(default)]
    pub input_directory: String,
    #[serde(default)]
    pub save_directory: String,
}

impl SettingsFile {
    /// Read the settings file, creating it with empty values if it is absent.
    ///
    /// A freshly created file yields empty directories, so the following run
    /// fails until the operator fills them in.
    pub fn load_or_create(path: &Path) -> Result<Self, ArchiveError> {
        if !path.exists() {
            info!(
                "Configuration file '{}' does not exist. Creating with default values.",
                path.display()
            );
            let settings = Self::default();
            settings.write(path)?;
            return Ok(settings);
        }
        Self::load(path)
    }

    /// Read and parse an existing settings file.
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let text = std::fs::read_to_string(path).map_err(|e| ArchiveError::SettingsRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ArchiveError::SettingsParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Serialise to `path`, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<(), ArchiveError> {
        let write_err = |e| ArchiveError::SettingsWrite {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let text = toml::to_string(self)
            .map_err(|e| ArchiveError::Internal(format!("settings serialisation: {e}")))?;
        std::fs::write(path, text).map_err(write_err)
    }
}

/// Default location of the settings file:
/// `<platform config dir>/invoice-archiver/invoice-archiver.toml`, falling
/// back to the working directory when the platform has no config dir.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("invoice-archiver"))
        .unwrap_or_default()
        .join("invoice-archiver.toml")
}
