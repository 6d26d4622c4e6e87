//! Flattens base + overlay per page and hands the images to a [`DocumentWriter`].

use image::RgbaImage;

use crate::error::{AppError, AppResult};
use crate::surface::{PageEntry, Surface};
use crate::writer::DocumentWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub bytes: Vec<u8>,
    pub exported_pages: Vec<usize>,
    pub skipped_pages: Vec<usize>,
}

/// Base drawn onto a cleared scratch surface, overlay drawn on top.
///
/// Returns `None` for pages whose surfaces are not provisioned yet.
pub fn flatten_page(entry: &PageEntry) -> Option<RgbaImage> {
    if !entry.is_exportable() {
        return None;
    }
    let (width, height) = entry.dimensions();
    let mut scratch = Surface::new(width, height);
    scratch.draw_over(entry.base());
    scratch.draw_over(entry.overlay());
    Some(scratch.into_image())
}

/// Exports every provisioned page in index order. Unavailable pages are skipped with a
/// warning; an export with no available page at all fails.
pub fn export_pages(pages: &[PageEntry], writer: &dyn DocumentWriter) -> AppResult<ExportReport> {
    let mut ordered: Vec<&PageEntry> = pages.iter().collect();
    ordered.sort_by_key(|entry| entry.index());

    let mut images = Vec::with_capacity(ordered.len());
    let mut exported_pages = Vec::with_capacity(ordered.len());
    let mut skipped_pages = Vec::new();
    for entry in ordered {
        match flatten_page(entry) {
            Some(image) => {
                images.push(image);
                exported_pages.push(entry.index());
            }
            None => {
                log::warn!(
                    "skipping page {} at export: surfaces are not provisioned",
                    entry.index() + 1
                );
                skipped_pages.push(entry.index());
            }
        }
    }

    if images.is_empty() {
        return Err(AppError::export("no page is ready for export"));
    }

    let bytes = writer.write_document(&images)?;
    log::info!(
        "exported {} page(s), skipped {}",
        exported_pages.len(),
        skipped_pages.len()
    );
    Ok(ExportReport {
        bytes,
        exported_pages,
        skipped_pages,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use image::{Rgba, RgbaImage};
    use kurbo::Rect;

    use super::{export_pages, flatten_page};
    use crate::backend::RgbaFrame;
    use crate::error::AppResult;
    use crate::surface::{PageEntry, PageState};
    use crate::writer::DocumentWriter;

    #[derive(Default)]
    struct RecordingWriter {
        received: RefCell<Vec<RgbaImage>>,
    }

    impl DocumentWriter for RecordingWriter {
        fn write_document(&self, images: &[RgbaImage]) -> AppResult<Vec<u8>> {
            self.received.borrow_mut().extend_from_slice(images);
            Ok(b"written".to_vec())
        }
    }

    fn ready_page(index: usize, width: u32, height: u32, shade: u8) -> PageEntry {
        let mut entry = PageEntry::new(index);
        entry
            .allocate_surfaces(width, height)
            .expect("surfaces are sized once");
        let frame = RgbaFrame {
            width,
            height,
            pixels: [shade, shade, shade, 255]
                .repeat(width as usize * height as usize)
                .into(),
        };
        entry.base_mut().blit_frame(&frame).expect("frame fits");
        entry.set_state(PageState::Ready);
        entry
    }

    #[test]
    fn untouched_overlay_flattens_to_base_pixels() {
        let mut entry = ready_page(0, 16, 8, 200);
        entry
            .base_mut()
            .fill_rect(Rect::new(2.0, 2.0, 5.0, 5.0), Rgba([10, 20, 30, 128]));

        let flattened = flatten_page(&entry).expect("ready page flattens");
        assert_eq!(&flattened, entry.base().image());
    }

    #[test]
    fn pending_pages_do_not_flatten() {
        assert!(flatten_page(&PageEntry::new(0)).is_none());
    }

    #[test]
    fn export_keeps_page_order_and_skips_unready_pages() {
        let pages = vec![
            ready_page(0, 4, 4, 10),
            PageEntry::new(1),
            ready_page(2, 4, 4, 30),
        ];
        let writer = RecordingWriter::default();

        let report = export_pages(&pages, &writer).expect("export should succeed");

        assert_eq!(report.bytes, b"written".to_vec());
        assert_eq!(report.exported_pages, vec![0, 2]);
        assert_eq!(report.skipped_pages, vec![1]);
        let received = writer.received.borrow();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].get_pixel(0, 0)[0], 10);
        assert_eq!(received[1].get_pixel(0, 0)[0], 30);
    }

    #[test]
    fn export_without_any_ready_page_fails() {
        let pages = vec![PageEntry::new(0), PageEntry::new(1)];
        assert!(export_pages(&pages, &RecordingWriter::default()).is_err());
    }
}
