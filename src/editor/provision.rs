use std::sync::Arc;

use crate::backend::RgbaFrame;
use crate::config::RenderConfig;
use crate::error::AppResult;
use crate::render::worker::RenderWorkerResult;
use crate::render::{RenderKey, RenderTask};
use crate::surface::{LABEL_COLOR, PageEntry, PageState, WHITE, draw_page_label, page_label_text};

use super::Editor;

impl Editor {
    pub(super) fn enqueue_page(&mut self, page: usize, attempt: u8) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let task = RenderTask {
            key: RenderKey::new(session.id(), page),
            scale: self.config.render.scale,
            attempt,
            bytes: Arc::clone(session.bytes()),
        };
        if !self.worker.enqueue(task) {
            self.fail_page(page, "render worker rejected the task".to_string());
        }
    }

    /// Applies every result that is already available without waiting.
    pub fn poll_render_results(&mut self) -> usize {
        let mut applied = 0;
        while let Some(result) = self.worker.try_recv_result() {
            if self.apply_render_result(result) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits until every page of the current session is either rendered or failed.
    pub async fn settle(&mut self) {
        loop {
            self.poll_render_results();
            if self.is_settled() {
                return;
            }
            if self.worker.live_in_flight_len() == 0 {
                self.fail_pending_pages();
                return;
            }
            match self.worker.recv_result().await {
                Some(result) => {
                    self.apply_render_result(result);
                }
                None => {
                    self.fail_pending_pages();
                    return;
                }
            }
        }
    }

    fn apply_render_result(&mut self, result: RenderWorkerResult) -> bool {
        let Some(session_id) = self.session.as_ref().map(|session| session.id()) else {
            return false;
        };
        if result.key.session_id != session_id {
            log::trace!(
                "dropping stale render result for session {}",
                result.key.session_id
            );
            return false;
        }

        let page = result.key.page;
        match result.result {
            Ok(frame) => {
                log::debug!(
                    "page {} rendered {}x{} in {:?}",
                    page + 1,
                    frame.width,
                    frame.height,
                    result.elapsed
                );
                if let Err(err) = self.provision_page(page, &frame) {
                    self.fail_page(page, err.to_string());
                }
            }
            Err(err) if result.attempt < self.config.render.retry_failed_pages => {
                log::warn!(
                    "page {} failed to render (attempt {}): {err}; retrying",
                    page + 1,
                    result.attempt + 1
                );
                self.enqueue_page(page, result.attempt + 1);
            }
            Err(err) => self.fail_page(page, err.to_string()),
        }
        true
    }

    /// Sizes the page's surfaces to the frame, draws the frame and label onto the base
    /// and attaches pointer handling to the overlay.
    fn provision_page(&mut self, page: usize, frame: &RgbaFrame) -> AppResult<()> {
        let controller = self.new_pointer_controller();
        let render = self.config.render.clone();
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let page_count = session.page_count();
        let Some(entry) = session.page_mut(page) else {
            return Ok(());
        };

        entry.allocate_surfaces(frame.width, frame.height)?;
        entry.base_mut().blit_frame(frame)?;
        label_page(entry, page_count, &render);
        entry.set_state(PageState::Ready);
        entry.bind(controller);
        Ok(())
    }

    /// Degrades a page: sized from its intrinsic dimensions when known, white base,
    /// still editable.
    fn fail_page(&mut self, page: usize, reason: String) {
        let controller = self.new_pointer_controller();
        let render = self.config.render.clone();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        log::error!("page {} could not be rendered: {reason}", page + 1);

        let target = session
            .decoder()
            .page_dimensions(page)
            .ok()
            .map(|(width, height)| scaled_dimensions(width, height, render.scale));
        let page_count = session.page_count();
        let Some(entry) = session.page_mut(page) else {
            return;
        };

        if let Some((width, height)) = target
            && (entry.base().is_allocated() || entry.allocate_surfaces(width, height).is_ok())
        {
            entry.base_mut().fill(WHITE);
            label_page(entry, page_count, &render);
            entry.bind(controller);
        }
        entry.set_state(PageState::Failed { reason });
    }

    fn fail_pending_pages(&mut self) {
        let pending: Vec<usize> = self
            .pages()
            .iter()
            .filter(|entry| !entry.is_settled())
            .map(PageEntry::index)
            .collect();
        for page in pending {
            self.fail_page(page, "render result never arrived".to_string());
        }
    }
}

fn label_page(entry: &mut PageEntry, page_count: usize, render: &RenderConfig) {
    let text = page_label_text(entry.index(), page_count);
    draw_page_label(
        entry.base_mut(),
        &text,
        render.label_offset,
        render.label_scale,
        LABEL_COLOR,
    );
}

fn scaled_dimensions(width: f32, height: f32, scale: f32) -> (u32, u32) {
    let scale_side = |side: f32| (side * scale).round().max(1.0) as u32;
    (scale_side(width), scale_side(height))
}
