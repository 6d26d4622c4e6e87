use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::backend::{DocumentLoader, PdfBackend, RgbaFrame};
use crate::error::{AppError, AppResult};

/// Identifies one page rasterization of one document session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub session_id: u64,
    pub page: usize,
}

impl RenderKey {
    pub fn new(session_id: u64, page: usize) -> Self {
        Self { session_id, page }
    }
}

#[derive(Debug, Clone)]
pub struct RenderTask {
    pub key: RenderKey,
    pub scale: f32,
    pub attempt: u8,
    pub bytes: Arc<Vec<u8>>,
}

enum RenderWorkerRequest {
    Task { task_id: u64, task: RenderTask },
    Shutdown,
}

#[derive(Debug)]
pub(crate) struct RenderWorkerResult {
    pub(crate) key: RenderKey,
    pub(crate) attempt: u8,
    pub(crate) result: AppResult<RgbaFrame>,
    pub(crate) elapsed: Duration,
}

#[derive(Debug)]
pub(crate) struct RenderResultEvent {
    pub(crate) task_id: u64,
    pub(crate) key: RenderKey,
    pub(crate) attempt: u8,
    pub(crate) result: AppResult<RgbaFrame>,
    pub(crate) elapsed: Duration,
}

/// Pool of blocking render threads. Results come back over a channel and are only
/// accepted while their task is still tracked and not canceled.
pub(crate) struct RenderWorker {
    request_tx: UnboundedSender<RenderWorkerRequest>,
    result_rx: UnboundedReceiver<RenderResultEvent>,
    in_flight: HashMap<RenderKey, InFlightTask>,
    active_session: Arc<AtomicU64>,
    _runtime: RenderWorkerRuntime,
    workers: Vec<JoinHandle<()>>,
    worker_threads: usize,
    next_task_id: u64,
}

struct RenderWorkerRuntime {
    _owned: Option<Runtime>,
    handle: Handle,
}

impl RenderWorkerRuntime {
    fn new() -> AppResult<Self> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(Self {
                _owned: None,
                handle,
            });
        }

        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("mpdf-render")
            .build()
            .map_err(|source| {
                AppError::io_with_context(source, "failed to start render runtime")
            })?;
        let handle = runtime.handle().clone();
        Ok(Self {
            _owned: Some(runtime),
            handle,
        })
    }

    fn spawn_blocking<F>(&self, task: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn_blocking(task)
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlightTask {
    task_id: u64,
    canceled: bool,
}

impl RenderWorker {
    pub(crate) fn spawn(worker_threads: usize, loader: Arc<dyn DocumentLoader>) -> AppResult<Self> {
        let (request_tx, request_rx) = unbounded_channel();
        let (result_tx, result_rx) = unbounded_channel();
        let runtime = RenderWorkerRuntime::new()?;
        let worker_threads = worker_threads.max(1);
        let request_rx = Arc::new(Mutex::new(request_rx));
        let active_session = Arc::new(AtomicU64::new(0));
        let mut workers = Vec::with_capacity(worker_threads);
        for _ in 0..worker_threads {
            let request_rx = Arc::clone(&request_rx);
            let loader = Arc::clone(&loader);
            let active_session = Arc::clone(&active_session);
            let result_tx = result_tx.clone();
            let worker = runtime.spawn_blocking(move || {
                render_worker_main(request_rx, loader, active_session, result_tx)
            });
            workers.push(worker);
        }

        Ok(Self {
            request_tx,
            result_rx,
            in_flight: HashMap::new(),
            active_session,
            _runtime: runtime,
            workers,
            worker_threads,
            next_task_id: 1,
        })
    }

    /// Tasks of any other session are skipped by the workers from now on. Session ids start
    /// at 1; 0 means no document is open.
    pub(crate) fn activate_session(&mut self, session_id: u64) -> usize {
        self.active_session.store(session_id, Ordering::Release);
        self.cancel_except_session(session_id)
    }

    pub(crate) fn enqueue(&mut self, task: RenderTask) -> bool {
        let key = task.key;
        if self.in_flight.contains_key(&key) {
            return false;
        }
        let task_id = self.next_task_id;
        self.next_task_id = self.next_task_id.saturating_add(1);

        if self
            .request_tx
            .send(RenderWorkerRequest::Task { task_id, task })
            .is_err()
        {
            return false;
        }
        self.in_flight.insert(
            key,
            InFlightTask {
                task_id,
                canceled: false,
            },
        );
        true
    }

    #[cfg(test)]
    pub(crate) fn has_in_flight(&self, key: &RenderKey) -> bool {
        self.in_flight.contains_key(key)
    }

    fn cancel_except_session(&mut self, session_id: u64) -> usize {
        let mut canceled = 0;
        for (key, entry) in &mut self.in_flight {
            if key.session_id != session_id && !entry.canceled {
                entry.canceled = true;
                canceled += 1;
            }
        }
        canceled
    }

    pub(crate) fn accept_result_event(
        &mut self,
        result: RenderResultEvent,
    ) -> Option<RenderWorkerResult> {
        let entry = self.in_flight.remove(&result.key)?;
        if entry.task_id != result.task_id || entry.canceled {
            log::trace!(
                "discarding render result for session {} page {}",
                result.key.session_id,
                result.key.page
            );
            return None;
        }

        Some(RenderWorkerResult {
            key: result.key,
            attempt: result.attempt,
            result: result.result,
            elapsed: result.elapsed,
        })
    }

    #[cfg(test)]
    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn live_in_flight_len(&self) -> usize {
        self.in_flight.values().filter(|entry| !entry.canceled).count()
    }

    pub(crate) async fn recv_result(&mut self) -> Option<RenderWorkerResult> {
        while let Some(event) = self.result_rx.recv().await {
            if let Some(result) = self.accept_result_event(event) {
                return Some(result);
            }
        }
        None
    }

    pub(crate) fn try_recv_result(&mut self) -> Option<RenderWorkerResult> {
        while let Ok(event) = self.result_rx.try_recv() {
            if let Some(result) = self.accept_result_event(event) {
                return Some(result);
            }
        }
        None
    }

    fn shutdown(&mut self) {
        self.active_session.store(0, Ordering::Release);
        for _ in 0..self.worker_threads {
            let _ = self.request_tx.send(RenderWorkerRequest::Shutdown);
        }
        while let Some(worker) = self.workers.pop() {
            worker.abort();
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_worker_main(
    request_rx: Arc<Mutex<UnboundedReceiver<RenderWorkerRequest>>>,
    loader: Arc<dyn DocumentLoader>,
    active_session: Arc<AtomicU64>,
    result_tx: UnboundedSender<RenderResultEvent>,
) {
    let mut doc: Option<(u64, AppResult<Box<dyn PdfBackend>>)> = None;
    loop {
        let request = match request_rx.lock() {
            Ok(mut request_rx) => request_rx.blocking_recv(),
            Err(_) => None,
        };
        let request = match request {
            Some(request) => request,
            None => break,
        };

        match request {
            RenderWorkerRequest::Task { task_id, task } => {
                let started = Instant::now();
                let result = if task.key.session_id != active_session.load(Ordering::Acquire) {
                    Err(AppError::unsupported("render task belongs to a replaced session"))
                } else {
                    let reuse = doc.as_ref().is_some_and(|(session_id, opened)| {
                        *session_id == task.key.session_id && opened.is_ok()
                    });
                    if !reuse {
                        doc = Some((task.key.session_id, loader.open(Arc::clone(&task.bytes))));
                    }
                    match doc.as_ref().map(|(_, doc)| doc) {
                        Some(Ok(doc)) => doc
                            .render_page(task.key.page, task.scale)
                            .map_err(|err| AppError::pdf_render(task.key.page, err)),
                        Some(Err(err)) => Err(AppError::unsupported(format!(
                            "render worker failed to open document: {err}"
                        ))),
                        None => Err(AppError::unsupported("render worker has no document")),
                    }
                };

                let event = RenderResultEvent {
                    task_id,
                    key: task.key,
                    attempt: task.attempt,
                    result,
                    elapsed: started.elapsed(),
                };

                let _ = result_tx.send(event);
            }
            RenderWorkerRequest::Shutdown => break,
        }
    }
}
