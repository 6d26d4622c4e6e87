use crate::error::{AppError, AppResult};

mod hayro;
mod traits;

pub use hayro::{HayroLoader, PdfDoc};
pub use traits::{DocumentLoader, PdfBackend, RgbaFrame};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Rejects anything that does not carry the PDF header.
pub fn ensure_pdf_media_type(bytes: &[u8]) -> AppResult<()> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    Err(AppError::unsupported_input(format!(
        "expected a {PDF_MEDIA_TYPE} document"
    )))
}
