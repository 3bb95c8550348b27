//! Image preprocessing: grayscale → 5×5 Gaussian blur → binary threshold.
//!
//! Phone and flatbed scans of paper invoices carry sensor noise, JPEG
//! blocking and uneven lighting. Smoothing then hard-thresholding turns the QR
//! modules into clean black and white blocks, which the finder-pattern search
//! in [`super::qr`] locks onto far more reliably than raw camera pixels.
//!
//! The three steps reproduce the classic OpenCV recipe
//! (`cvtColor(BGR2GRAY)`, `GaussianBlur((5,5), 0)`, `threshold(127, 255,
//! BINARY)`) in plain Rust so no native vision library is needed.

use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, warn};

/// Luminance strictly above this becomes white; everything else black.
pub const THRESHOLD: u8 = 127;

/// Binomial 5-tap kernel. With sigma derived from a 5×5 size this is the
/// exact Gaussian OpenCV uses (`[1 4 6 4 1] / 16`).
const KERNEL: [u32; 5] = [1, 4, 6, 4, 1];
const KERNEL_SHIFT: u32 = 4; // log2(sum(KERNEL))

/// Run all three preprocessing steps.
///
/// Returns `None` (after logging why) when the image has no pixels; callers
/// skip the image in that case. The input is not modified.
pub fn preprocess(image: &DynamicImage) -> Option<GrayImage> {
    if image.width() == 0 || image.height() == 0 {
        warn!(
            "Error occurred during image preprocessing: image is {}x{}",
            image.width(),
            image.height()
        );
        return None;
    }

    let gray = to_grayscale(image);
    let blurred = gaussian_blur_5x5(&gray);
    let binary = threshold(&blurred, THRESHOLD);
    debug!("Preprocessed frame {}x{}", binary.width(), binary.height());
    Some(binary)
}

/// ITU-R BT.601 luminance in 14-bit fixed point, rounded. Not `to_luma8`,
/// which weights channels per BT.709.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (x, y, p) in rgb.enumerate_pixels() {
        let [r, g, b] = p.0;
        let luma = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
        gray.put_pixel(x, y, Luma([luma as u8]));
    }
    gray
}

/// Separable 5×5 Gaussian blur with reflect-101 borders (`dcb|abcd|cba`).
pub fn gaussian_blur_5x5(src: &GrayImage) -> GrayImage {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let px = src.as_raw();

    // Horizontal pass keeps the unnormalised sums (max 255 * 16).
    let mut horizontal = vec![0u32; w * h];
    for y in 0..h {
        let row = &px[y * w..(y + 1) * w];
        for x in 0..w {
            horizontal[y * w + x] = KERNEL
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * row[reflect_101(x as isize + k as isize - 2, w)] as u32)
                .sum();
        }
    }

    let mut out = GrayImage::new(w as u32, h as u32);
    let round = 1 << (2 * KERNEL_SHIFT - 1);
    for y in 0..h {
        for x in 0..w {
            let sum: u32 = KERNEL
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    weight * horizontal[reflect_101(y as isize + k as isize - 2, h) * w + x]
                })
                .sum();
            out.put_pixel(x as u32, y as u32, Luma([((sum + round) >> (2 * KERNEL_SHIFT)) as u8]));
        }
    }
    out
}

/// Map every pixel to 255 if it is above `cutoff`, else 0.
pub fn threshold(src: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = src.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > cutoff { 255 } else { 0 };
    }
    out
}

fn reflect_101(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    // Kernel radius is 2, so one reflection suffices unless len == 2.
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}
