//! Archival: write the invoice PDF, or recognise a duplicate, then delete the
//! source image.
//!
//! ## Duplicate detection
//!
//! There is no index of processed invoices. The output directory's file names
//! are the index: if `<DocNo>_<DocDt>.pdf` already exists the invoice has been
//! archived before, the new scan is discarded and the existing PDF is left
//! untouched. Only one instance should run per directory pair. Should two
//! runs race anyway, the finished PDF is linked into place rather than
//! renamed over the target, so the first writer's file is kept and the later
//! run treats its scan as a duplicate.
//!
//! ## Partial files
//!
//! The PDF is rendered to `<target>.tmp` and renamed into place, so a crash
//! mid-write never leaves a truncated file at the target path that a later run
//! would take for a duplicate.

use crate::error::{ArchiveError, ImageError};
use crate::output::ImageOutcome;
use crate::pipeline::sanitize::ArchiveTarget;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Left and top margin of the image on the page.
pub const PAGE_MARGIN_MM: f32 = 10.0;
/// Rendered image width; height follows the image's aspect ratio.
pub const IMAGE_WIDTH_MM: f32 = 190.0;

/// Renders one image onto a new single-page PDF.
///
/// The error is a human-readable cause; the caller reports it as
/// [`ImageError::PdfWrite`] and keeps the source image.
pub trait PdfWriter {
    fn write_pdf(&self, image: &DynamicImage, path: &Path) -> Result<(), String>;
}

/// [`PdfWriter`] backed by pdfium.
///
/// Places the image on an A4 page [`PAGE_MARGIN_MM`] from the top-left
/// corner, [`IMAGE_WIDTH_MM`] wide.
pub struct PdfiumWriter {
    pdfium: Pdfium,
}

impl PdfiumWriter {
    /// Bind to the pdfium shared library.
    ///
    /// Resolution order (first match wins):
    /// 1. `PDFIUM_LIB_PATH`, a path to the library file
    /// 2. the platform library name in the working directory
    /// 3. the system library search path
    pub fn new() -> Result<Self, ArchiveError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => Pdfium::bind_to_library(path),
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ArchiveError::PdfEngineUnavailable(format!("{:?}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfWriter for PdfiumWriter {
    fn write_pdf(&self, image: &DynamicImage, path: &Path) -> Result<(), String> {
        let mut document = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| format!("{:?}", e))?;

        {
            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::a4())
                .map_err(|e| format!("{:?}", e))?;

            let margin = PdfPoints::from_mm(PAGE_MARGIN_MM);
            let width = PdfPoints::from_mm(IMAGE_WIDTH_MM);
            let height = PdfPoints::new(width.value * image.height() as f32 / image.width() as f32);
            // PDF y runs bottom-up; anchor the image's top edge at the margin.
            let bottom = PdfPoints::new(page.height().value - margin.value - height.value);

            page.objects_mut()
                .create_image_object(margin, bottom, image, Some(width), Some(height))
                .map_err(|e| format!("{:?}", e))?;
        }

        document
            .save_to_file(path)
            .map_err(|e| format!("{:?}", e))?;
        debug!("Rendered {}x{} image into {}", image.width(), image.height(), path.display());
        Ok(())
    }
}

/// Archive one decoded invoice image.
///
/// 1. Ensure `save_dir` exists.
/// 2. Target exists: delete `source`, return [`ImageOutcome::Duplicate`].
/// 3. Otherwise write the PDF, delete `source`, return [`ImageOutcome::Archived`].
///
/// `source` is only deleted on those two paths. If the PDF cannot be written
/// the source stays and the error is returned.
pub fn archive_image(
    source: &Path,
    image: &DynamicImage,
    target: &ArchiveTarget,
    save_dir: &Path,
    writer: &dyn PdfWriter,
) -> Result<ImageOutcome, ImageError> {
    std::fs::create_dir_all(save_dir).map_err(|e| ImageError::CreateSaveDirectory {
        path: save_dir.to_path_buf(),
        detail: e.to_string(),
    })?;

    if target.path().exists() {
        return discard_duplicate(source, target);
    }

    let partial = partial_path(target.path());
    let write_failed = |detail: String| {
        let _ = std::fs::remove_file(&partial);
        ImageError::PdfWrite {
            path: target.path().to_path_buf(),
            detail,
        }
    };
    writer.write_pdf(image, &partial).map_err(write_failed)?;
    match publish(&partial, target.path()) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let _ = std::fs::remove_file(&partial);
            return discard_duplicate(source, target);
        }
        Err(e) => return Err(write_failed(e.to_string())),
    }
    info!(
        "PDF saved as '{}' in '{}'",
        target.file_name(),
        save_dir.display()
    );

    remove_source(source, "deleted after processing")?;
    Ok(ImageOutcome::Archived {
        target: target.path().to_path_buf(),
    })
}

fn discard_duplicate(source: &Path, target: &ArchiveTarget) -> Result<ImageOutcome, ImageError> {
    info!(
        "Duplicate Invoice: The invoice '{}' already exists.",
        target.file_name()
    );
    remove_source(source, "deleted from input directory")?;
    Ok(ImageOutcome::Duplicate {
        target: target.path().to_path_buf(),
    })
}

/// Move the finished PDF to `target` without replacing an existing file.
///
/// Fails with `AlreadyExists` if `target` appeared after the duplicate
/// check. Filesystems without hard links fall back to `rename`.
fn publish(partial: &Path, target: &Path) -> io::Result<()> {
    match std::fs::hard_link(partial, target) {
        Ok(()) => {
            if let Err(e) = std::fs::remove_file(partial) {
                debug!("Could not remove {}: {}", partial.display(), e);
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            debug!("hard link unavailable ({}), renaming instead", e);
            std::fs::rename(partial, target)
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension("pdf.tmp")
}

fn remove_source(source: &Path, what: &str) -> Result<(), ImageError> {
    std::fs::remove_file(source).map_err(|e| ImageError::RemoveSource {
        path: source.to_path_buf(),
        detail: e.to_string(),
    })?;
    info!("Image '{}' {}", display_name(source), what);
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::InvoiceMetadata;
    use image::{Rgb, RgbImage};
    use std::cell::Cell;

    /// Writes a marker file instead of a real PDF.
    #[derive(Default)]
    struct MarkerWriter {
        calls: Cell<usize>,
        fail: bool,
    }

    impl PdfWriter for MarkerWriter {
        fn write_pdf(&self, _image: &DynamicImage, path: &Path) -> Result<(), String> {
            self.calls.set(self.calls.get() + 1);
            std::fs::write(path, b"%PDF-marker").map_err(|e| e.to_string())?;
            if self.fail {
                return Err("renderer exploded".into());
            }
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        source: PathBuf,
        save_dir: PathBuf,
        target: ArchiveTarget,
        image: DynamicImage,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.jpg");
        std::fs::write(&source, b"jpeg bytes").unwrap();
        let save_dir = dir.path().join("archive").join("2024");
        let target = ArchiveTarget::new(
            &save_dir,
            &InvoiceMetadata {
                document_number: "INV-1".into(),
                document_date: "2024-01-02".into(),
            },
        );
        Fixture {
            _dir: dir,
            source,
            save_dir,
            target,
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([9, 9, 9]))),
        }
    }

    #[test]
    fn archives_new_invoice() {
        let f = fixture();
        let writer = MarkerWriter::default();

        let outcome = archive_image(&f.source, &f.image, &f.target, &f.save_dir, &writer).unwrap();

        assert_eq!(
            outcome,
            ImageOutcome::Archived {
                target: f.target.path().to_path_buf()
            }
        );
        assert_eq!(writer.calls.get(), 1);
        assert!(f.target.path().exists());
        assert!(!partial_path(f.target.path()).exists());
        assert!(!f.source.exists());
    }

    #[test]
    fn duplicate_deletes_source_and_keeps_existing_pdf() {
        let f = fixture();
        std::fs::create_dir_all(&f.save_dir).unwrap();
        std::fs::write(f.target.path(), b"original").unwrap();
        let writer = MarkerWriter::default();

        let outcome = archive_image(&f.source, &f.image, &f.target, &f.save_dir, &writer).unwrap();

        assert!(matches!(outcome, ImageOutcome::Duplicate { .. }));
        assert_eq!(writer.calls.get(), 0);
        assert_eq!(std::fs::read(f.target.path()).unwrap(), b"original");
        assert!(!f.source.exists());
        assert_eq!(std::fs::read_dir(&f.save_dir).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_keeps_source_and_leaves_no_file() {
        let f = fixture();
        let writer = MarkerWriter {
            fail: true,
            ..Default::default()
        };

        let err = archive_image(&f.source, &f.image, &f.target, &f.save_dir, &writer).unwrap_err();

        assert!(matches!(err, ImageError::PdfWrite { .. }), "got: {err:?}");
        assert!(f.source.exists());
        assert!(!f.target.path().exists());
        assert!(!partial_path(f.target.path()).exists());
    }

    #[test]
    fn save_dir_that_is_a_file_is_reported() {
        let f = fixture();
        std::fs::create_dir_all(f.save_dir.parent().unwrap()).unwrap();
        std::fs::write(&f.save_dir, b"not a directory").unwrap();

        let err = archive_image(&f.source, &f.image, &f.target, &f.save_dir, &MarkerWriter::default())
            .unwrap_err();

        assert!(matches!(err, ImageError::CreateSaveDirectory { .. }), "got: {err:?}");
        assert!(f.source.exists());
    }

    #[test]
    fn undeletable_source_is_reported_and_retried_as_duplicate() {
        let f = fixture();
        std::fs::remove_file(&f.source).unwrap();
        std::fs::create_dir(&f.source).unwrap();
        let writer = MarkerWriter::default();

        let err = archive_image(&f.source, &f.image, &f.target, &f.save_dir, &writer).unwrap_err();

        assert!(matches!(err, ImageError::RemoveSource { .. }), "got: {err:?}");
        assert!(f.target.path().exists());
        assert!(!partial_path(f.target.path()).exists());

        // Once the scan can be removed, the next pass finds the PDF already there.
        std::fs::remove_dir(&f.source).unwrap();
        std::fs::write(&f.source, b"jpeg bytes").unwrap();
        let outcome = archive_image(&f.source, &f.image, &f.target, &f.save_dir, &writer).unwrap();

        assert!(matches!(outcome, ImageOutcome::Duplicate { .. }), "got: {outcome:?}");
        assert_eq!(writer.calls.get(), 1);
        assert!(!f.source.exists());
    }

    /// Creates the target itself while "rendering", as a concurrent run would.
    struct RacingWriter;

    impl PdfWriter for RacingWriter {
        fn write_pdf(&self, _image: &DynamicImage, path: &Path) -> Result<(), String> {
            let target = path.with_extension("");
            std::fs::write(&target, b"other run").map_err(|e| e.to_string())?;
            std::fs::write(path, b"%PDF-late").map_err(|e| e.to_string())
        }
    }

    #[test]
    fn target_created_during_write_is_not_replaced() {
        let f = fixture();

        let outcome =
            archive_image(&f.source, &f.image, &f.target, &f.save_dir, &RacingWriter).unwrap();

        assert!(matches!(outcome, ImageOutcome::Duplicate { .. }), "got: {outcome:?}");
        assert_eq!(std::fs::read(f.target.path()).unwrap(), b"other run");
        assert!(!partial_path(f.target.path()).exists());
        assert!(!f.source.exists());
    }

    #[test]
    fn partial_path_keeps_dotted_names() {
        assert_eq!(
            partial_path(Path::new("out/INV.1_2024.pdf")),
            PathBuf::from("out/INV.1_2024.pdf.tmp")
        );
    }
}
