use crate::error::{AppError, AppResult};
use crate::pointer::{PointerController, PointerEvent};

use super::{PixelBounds, Surface};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Allocated, rasterization not finished yet.
    Pending,
    Ready,
    /// Rasterization gave up; the base holds a blank placeholder when the page size is known.
    Failed { reason: String },
}

/// One page: base render, user overlay and the pointer binding for that overlay.
#[derive(Debug)]
pub struct PageEntry {
    index: usize,
    base: Surface,
    overlay: Surface,
    state: PageState,
    binding: Option<PointerController>,
}

impl PageEntry {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            base: Surface::default(),
            overlay: Surface::default(),
            state: PageState::Pending,
            binding: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn base(&self) -> &Surface {
        &self.base
    }

    pub fn overlay(&self) -> &Surface {
        &self.overlay
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.base.dimensions()
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.state, PageState::Pending)
    }

    /// Surfaces are sized and hold content that can be flattened.
    pub fn is_exportable(&self) -> bool {
        self.is_settled() && self.base.is_allocated()
    }

    /// Sizes both surfaces together. Only allowed once, before any content is written.
    pub(crate) fn allocate_surfaces(&mut self, width: u32, height: u32) -> AppResult<()> {
        if self.base.is_allocated() || self.overlay.is_allocated() {
            return Err(AppError::invalid_argument(format!(
                "page {} surfaces are already sized",
                self.index
            )));
        }
        self.base.resize(width, height);
        self.overlay.resize(width, height);
        Ok(())
    }

    pub(crate) fn base_mut(&mut self) -> &mut Surface {
        &mut self.base
    }

    pub(crate) fn set_state(&mut self, state: PageState) {
        self.state = state;
    }

    /// Attaches pointer handling to this page's overlay. A page holds at most one binding.
    pub fn bind(&mut self, controller: PointerController) -> bool {
        if self.binding.is_some() {
            return false;
        }
        self.binding = Some(controller);
        true
    }

    pub fn unbind(&mut self) -> bool {
        self.binding.take().is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn pointer(&self) -> Option<&PointerController> {
        self.binding.as_ref()
    }

    /// Routes an event to the bound controller; events on unbound pages are dropped.
    pub fn dispatch_pointer(&mut self, event: PointerEvent) -> Option<PixelBounds> {
        let controller = self.binding.as_mut()?;
        controller.handle(&mut self.overlay, event)
    }
}
