use std::sync::Arc;

use crate::backend::PdfBackend;
use crate::surface::{PageEntry, PageState};

/// One open input document and its pages. The page list is fixed at creation.
pub struct DocumentSession {
    id: u64,
    bytes: Arc<Vec<u8>>,
    decoder: Box<dyn PdfBackend>,
    pages: Vec<PageEntry>,
}

impl DocumentSession {
    pub(crate) fn new(id: u64, bytes: Arc<Vec<u8>>, decoder: Box<dyn PdfBackend>) -> Self {
        let pages = (0..decoder.page_count()).map(PageEntry::new).collect();
        Self {
            id,
            bytes,
            decoder,
            pages,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    pub(crate) fn page_mut(&mut self, index: usize) -> Option<&mut PageEntry> {
        self.pages.get_mut(index)
    }

    pub(crate) fn bytes(&self) -> &Arc<Vec<u8>> {
        &self.bytes
    }

    pub(crate) fn decoder(&self) -> &dyn PdfBackend {
        self.decoder.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.pages.iter().all(PageEntry::is_settled)
    }

    pub fn failed_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|page| matches!(page.state(), PageState::Failed { .. }))
            .map(PageEntry::index)
            .collect()
    }

    /// Drops every pointer binding; called before the session is discarded.
    pub(crate) fn unbind_all(&mut self) -> usize {
        self.pages
            .iter_mut()
            .map(|page| usize::from(page.unbind()))
            .sum()
    }
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("id", &self.id)
            .field("byte_len", &self.bytes.len())
            .field("pages", &self.pages.len())
            .finish()
    }
}
