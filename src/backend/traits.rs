use std::sync::Arc;

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl RgbaFrame {
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Decoded document: page count, intrinsic page sizes and rasterization.
pub trait PdfBackend: Send {
    fn page_count(&self) -> usize;
    fn page_dimensions(&self, page: usize) -> AppResult<(f32, f32)>;
    fn render_page(&self, page: usize, scale: f32) -> AppResult<RgbaFrame>;
}

/// Opens decoders from raw document bytes.
///
/// The editor opens one decoder for page discovery and every render worker opens its own
/// from the same shared bytes.
pub trait DocumentLoader: Send + Sync {
    fn open(&self, bytes: Arc<Vec<u8>>) -> AppResult<Box<dyn PdfBackend>>;
}
