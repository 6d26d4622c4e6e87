use std::sync::Arc;

use hayro::hayro_interpret::InterpreterSettings;
use hayro::hayro_syntax::Pdf;
use hayro::vello_cpu::color::palette::css::WHITE;
use hayro::{RenderSettings, render};

use crate::error::{AppError, AppResult};

use super::ensure_pdf_media_type;
use super::traits::{DocumentLoader, PdfBackend, RgbaFrame};

pub struct PdfDoc {
    pdf: Pdf,
}

#[derive(Debug, Default)]
pub struct HayroLoader;

impl DocumentLoader for HayroLoader {
    fn open(&self, bytes: Arc<Vec<u8>>) -> AppResult<Box<dyn PdfBackend>> {
        PdfDoc::from_shared_bytes(bytes).map(|doc| Box::new(doc) as Box<dyn PdfBackend>)
    }
}

impl PdfBackend for PdfDoc {
    fn page_count(&self) -> usize {
        PdfDoc::page_count(self)
    }

    fn page_dimensions(&self, page: usize) -> AppResult<(f32, f32)> {
        PdfDoc::page_render_dimensions(self, page)
    }

    fn render_page(&self, page: usize, scale: f32) -> AppResult<RgbaFrame> {
        PdfDoc::render_page(self, page, scale)
    }
}

impl PdfDoc {
    pub fn from_shared_bytes(bytes: Arc<Vec<u8>>) -> AppResult<Self> {
        ensure_pdf_media_type(bytes.as_slice())?;
        let pdf = Pdf::new(bytes).map_err(|_| AppError::decode("failed to parse PDF with hayro"))?;
        if pdf.pages().is_empty() {
            return Err(AppError::decode("document has no pages"));
        }
        Ok(Self { pdf })
    }

    pub fn page_count(&self) -> usize {
        self.pdf.pages().len()
    }

    pub fn page_render_dimensions(&self, page: usize) -> AppResult<(f32, f32)> {
        let page_ref = self
            .pdf
            .pages()
            .get(page)
            .ok_or(AppError::invalid_argument("page index is out of range"))?;

        Ok(page_ref.render_dimensions())
    }

    pub fn render_page(&self, page: usize, scale: f32) -> AppResult<RgbaFrame> {
        if page >= self.page_count() {
            return Err(AppError::invalid_argument("page index is out of range"));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(AppError::invalid_argument(
                "scale must be a positive finite value",
            ));
        }

        let page_ref = self
            .pdf
            .pages()
            .get(page)
            .ok_or(AppError::invalid_argument("page index is out of range"))?;

        let render_settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            bg_color: WHITE,
            ..Default::default()
        };
        let interpreter_settings = InterpreterSettings::default();
        let pixmap = render(page_ref, &interpreter_settings, &render_settings);

        Ok(RgbaFrame {
            width: pixmap.width() as u32,
            height: pixmap.height() as u32,
            pixels: pixmap.data_as_u8_slice().to_vec().into(),
        })
    }
}
