//! Pipeline stages for invoice archival.
//!
//! Each submodule implements exactly one step. The four that touch an
//! external library ([`decode`], [`qr`], [`token`], [`store`]) expose a
//! capability trait next to their production implementation, so the driver
//! in [`crate::archiver`] can be exercised with fakes.
//!
//! ## Data Flow
//!
//! ```text
//! scan ──▶ decode ──▶ preprocess ──▶ qr ──▶ token ──▶ sanitize ──▶ store
//! (.jpg)   (image)    (gray/blur/    (rqrr)  (JWT →    (file name)  (PDF or
//!                      threshold)            metadata)              duplicate)
//! ```
//!
//! 1. [`scan`]        snapshot the `.jpg` files in the input directory
//! 2. [`decode`]      load the file into a `DynamicImage`
//! 3. [`preprocess`]  grayscale, 5×5 Gaussian blur, threshold at 127
//! 4. [`qr`]          decode every QR symbol in the frame
//! 5. [`token`]       read `DocNo`/`DocDt` from the token's `data` claim
//! 6. [`sanitize`]    build `<DocNo>_<DocDt>.pdf` with reserved chars replaced
//! 7. [`store`]       write the PDF or detect a duplicate, then delete the scan

pub mod decode;
pub mod preprocess;
pub mod qr;
pub mod sanitize;
pub mod scan;
pub mod store;
pub mod token;
