//! Owner of the active document session: provisioning, pointer routing and export.

mod provision;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use kurbo::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{DocumentLoader, HayroLoader, ensure_pdf_media_type};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::export::{ExportReport, export_pages};
use crate::pointer::{PointerController, PointerEvent};
use crate::render::worker::RenderWorker;
use crate::session::DocumentSession;
use crate::surface::{PageEntry, PixelBounds};
use crate::tool::{Mode, ModeController};
use crate::writer::{DocumentWriter, LopdfWriter};

pub struct Editor {
    config: Config,
    loader: Arc<dyn DocumentLoader>,
    worker: RenderWorker,
    modes: ModeController,
    session: Option<DocumentSession>,
    next_session_id: u64,
    rng: StdRng,
}

impl Editor {
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_loader(config, Arc::new(HayroLoader))
    }

    pub fn with_loader(config: Config, loader: Arc<dyn DocumentLoader>) -> AppResult<Self> {
        let worker = RenderWorker::spawn(config.render.worker_threads, Arc::clone(&loader))?;
        Ok(Self {
            config,
            loader,
            worker,
            modes: ModeController::new(),
            session: None,
            next_session_id: 1,
            rng: StdRng::from_entropy(),
        })
    }

    /// Makes mosaic patterns reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    /// Applies to every page, starting with the next pointer move.
    pub fn set_mode(&self, mode: Mode) {
        let previous = self.modes.set_mode(mode);
        if previous != mode {
            log::debug!("tool mode {previous} -> {mode}");
        }
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    pub fn pages(&self) -> &[PageEntry] {
        self.session
            .as_ref()
            .map(DocumentSession::pages)
            .unwrap_or_default()
    }

    pub fn is_settled(&self) -> bool {
        self.session.as_ref().is_none_or(DocumentSession::is_settled)
    }

    /// Replaces the current session with `bytes`.
    ///
    /// Input that is not a PDF, or that fails to decode, is rejected before anything is
    /// allocated and leaves the current session untouched. Rasterization of every page is
    /// queued; results are applied by [`Editor::poll_render_results`] or [`Editor::settle`].
    pub fn open_document(&mut self, bytes: Vec<u8>) -> AppResult<u64> {
        ensure_pdf_media_type(&bytes)?;
        let bytes = Arc::new(bytes);
        let decoder = self.loader.open(Arc::clone(&bytes)).map_err(|err| {
            if err.is_input_rejection() {
                err
            } else {
                AppError::decode(err.to_string())
            }
        })?;
        if decoder.page_count() == 0 {
            return Err(AppError::decode("document has no pages"));
        }

        let session_id = self.next_session_id;
        self.next_session_id = self.next_session_id.saturating_add(1);
        self.discard_session();
        let canceled = self.worker.activate_session(session_id);
        if canceled > 0 {
            log::debug!("canceled {canceled} render task(s) of the replaced session");
        }

        let session = DocumentSession::new(session_id, bytes, decoder);
        let page_count = session.page_count();
        self.session = Some(session);
        log::info!("opened session {session_id} with {page_count} page(s)");

        for page in 0..page_count {
            self.enqueue_page(page, 0);
        }
        Ok(session_id)
    }

    pub fn close_document(&mut self) {
        self.discard_session();
        self.worker.activate_session(0);
    }

    fn discard_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            let unbound = session.unbind_all();
            log::info!(
                "closed session {} ({unbound} pointer binding(s) released)",
                session.id()
            );
        }
    }

    /// Routes one pointer event to `page`'s overlay. Events on pages that are not bound
    /// yet are ignored.
    pub fn pointer_event(
        &mut self,
        page: usize,
        event: PointerEvent,
    ) -> AppResult<Option<PixelBounds>> {
        let session = self
            .session
            .as_mut()
            .ok_or(AppError::invalid_argument("no document is open"))?;
        let entry = session
            .page_mut(page)
            .ok_or(AppError::invalid_argument("page index is out of range"))?;
        Ok(entry.dispatch_pointer(event))
    }

    /// Pointer down at `from`, `steps` evenly spaced moves ending at `to`, pointer up.
    pub fn drag(&mut self, page: usize, from: Point, to: Point, steps: usize) -> AppResult<()> {
        self.pointer_event(page, PointerEvent::down(from.x, from.y))?;
        let steps = steps.max(1);
        for step in 1..=steps {
            let t = step as f64 / steps as f64;
            let point = from.lerp(to, t);
            self.pointer_event(page, PointerEvent::moved(point.x, point.y))?;
        }
        self.pointer_event(page, PointerEvent::up())?;
        Ok(())
    }

    pub fn default_writer(&self) -> LopdfWriter {
        LopdfWriter::new(self.config.export.page_width)
    }

    /// Flattens every page and encodes them with `writer`.
    ///
    /// With `export.wait_for_pages` the export waits for rasterization to settle first;
    /// otherwise pages still rendering are skipped.
    pub async fn export(&mut self, writer: &dyn DocumentWriter) -> AppResult<ExportReport> {
        if self.config.export.wait_for_pages {
            self.settle().await;
        } else {
            self.poll_render_results();
        }
        let session = self
            .session
            .as_ref()
            .ok_or(AppError::export("no document is open"))?;
        export_pages(session.pages(), writer)
    }

    fn new_pointer_controller(&mut self) -> PointerController {
        let rng = StdRng::seed_from_u64(self.rng.r#gen());
        PointerController::new(self.modes.handle(), self.config.tool, rng)
    }
}
