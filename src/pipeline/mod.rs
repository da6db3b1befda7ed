//! Conversion backends.
//!
//! Each submodule wraps exactly one external engine. All of them block, so
//! [`crate::convert::Converter`] always calls them through
//! `tokio::task::spawn_blocking`.
//!
//! ```text
//!            ┌── pdf → docx ──▶ pdf_docx  (pdfium text + docx-rs)
//! dispatch ──┼── documents  ──▶ office    (headless LibreOffice subprocess)
//!            └── images     ──▶ raster    (image crate decode/encode)
//! ```

pub mod office;
pub mod pdf_docx;
pub mod raster;
