//! QR extraction: find and decode every QR symbol in a preprocessed frame.

use image::GrayImage;
use tracing::debug;

/// Decodes zero or more barcode payloads from a single-channel frame.
///
/// Payloads are returned as raw bytes in detection order; interpreting them
/// is the token decoder's job. An empty vector means "no QR code".
pub trait BarcodeReader {
    fn read(&self, frame: &GrayImage) -> Vec<Vec<u8>>;
}

/// [`BarcodeReader`] backed by the pure-Rust `rqrr` decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrReader;

impl BarcodeReader for QrReader {
    fn read(&self, frame: &GrayImage) -> Vec<Vec<u8>> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.get_pixel(x as u32, y as u32).0[0],
        );

        let grids = prepared.detect_grids();
        debug!("Detected {} QR grid(s)", grids.len());

        grids
            .iter()
            .enumerate()
            .filter_map(|(i, grid)| {
                let mut payload = Vec::new();
                match grid.decode_to(&mut payload) {
                    Ok(meta) => {
                        debug!(
                            "Decoded QR grid {} (version {}, {} bytes)",
                            i + 1,
                            meta.version.0,
                            payload.len()
                        );
                        Some(payload)
                    }
                    Err(e) => {
                        // A finder pattern without a readable symbol is not a payload.
                        debug!("QR grid {} could not be decoded: {:?}", i + 1, e);
                        None
                    }
                }
            })
            .collect()
    }
}
