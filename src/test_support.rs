use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::backend::{DocumentLoader, PdfBackend, RgbaFrame, ensure_pdf_media_type};
use crate::error::{AppError, AppResult};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn unique_temp_path(suffix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut path = std::env::temp_dir();
    path.push(format!("mpdf_{suffix}_{}_{nanos}_{seq}", process::id()));
    path
}

/// Description of a synthetic document understood by [`FakeLoader`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeDocSpec {
    pub pages: Vec<(u32, u32)>,
    pub fill: [u8; 3],
    /// page -> number of render attempts that fail before one succeeds
    pub failures: Vec<(usize, u32)>,
    pub delay_ms: u64,
}

impl FakeDocSpec {
    pub fn uniform(page_count: usize, width: u32, height: u32, fill: [u8; 3]) -> Self {
        Self {
            pages: vec![(width, height); page_count],
            fill,
            failures: Vec::new(),
            delay_ms: 0,
        }
    }

    pub fn with_failures(mut self, page: usize, attempts: u32) -> Self {
        self.failures.push((page, attempts));
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let pages = self
            .pages
            .iter()
            .map(|(w, h)| format!("{w}x{h}"))
            .collect::<Vec<_>>()
            .join(",");
        let failures = self
            .failures
            .iter()
            .map(|(page, n)| format!("{page}:{n}"))
            .collect::<Vec<_>>()
            .join(",");
        let [r, g, b] = self.fill;
        format!(
            "%PDF-fake;pages={pages};fill={r},{g},{b};fail={failures};delay={}",
            self.delay_ms
        )
        .into_bytes()
    }

    fn parse(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        let mut fields = text.strip_prefix("%PDF-fake;")?.split(';');
        let pages = fields
            .next()?
            .strip_prefix("pages=")?
            .split(',')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (w, h) = part.split_once('x')?;
                Some((w.parse().ok()?, h.parse().ok()?))
            })
            .collect::<Option<Vec<_>>>()?;
        let fill_parts = fields
            .next()?
            .strip_prefix("fill=")?
            .split(',')
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u8>>>()?;
        let fill = [*fill_parts.first()?, *fill_parts.get(1)?, *fill_parts.get(2)?];
        let failures = fields
            .next()?
            .strip_prefix("fail=")?
            .split(',')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (page, n) = part.split_once(':')?;
                Some((page.parse().ok()?, n.parse().ok()?))
            })
            .collect::<Option<Vec<_>>>()?;
        let delay_ms = fields.next()?.strip_prefix("delay=")?.parse().ok()?;
        Some(Self {
            pages,
            fill,
            failures,
            delay_ms,
        })
    }
}

/// Loader for [`FakeDocSpec`] documents. Failure budgets are shared by every decoder the
/// loader opens, so retries on any worker consume the same budget.
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeLoader {
    remaining_failures: Arc<Mutex<HashMap<(Vec<u8>, usize), u32>>>,
    remaining_open_failures: Arc<Mutex<u32>>,
}

impl FakeLoader {
    /// The next `count` opens fail after the header check.
    pub fn with_open_failures(self, count: u32) -> Self {
        *self
            .remaining_open_failures
            .lock()
            .expect("open failure lock should not be poisoned") = count;
        self
    }
}

impl DocumentLoader for FakeLoader {
    fn open(&self, bytes: Arc<Vec<u8>>) -> AppResult<Box<dyn PdfBackend>> {
        ensure_pdf_media_type(bytes.as_slice())?;
        let spec = FakeDocSpec::parse(bytes.as_slice())
            .ok_or(AppError::decode("fake document is malformed"))?;
        if spec.pages.is_empty() {
            return Err(AppError::decode("document has no pages"));
        }
        {
            let mut remaining = self
                .remaining_open_failures
                .lock()
                .expect("open failure lock should not be poisoned");
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AppError::decode("injected open failure"));
            }
        }
        {
            let mut remaining = self
                .remaining_failures
                .lock()
                .expect("failure budget lock should not be poisoned");
            for (page, attempts) in &spec.failures {
                remaining
                    .entry((bytes.as_ref().clone(), *page))
                    .or_insert(*attempts);
            }
        }
        Ok(Box::new(FakeDoc {
            key: bytes.as_ref().clone(),
            spec,
            remaining_failures: Arc::clone(&self.remaining_failures),
        }))
    }
}

struct FakeDoc {
    key: Vec<u8>,
    spec: FakeDocSpec,
    remaining_failures: Arc<Mutex<HashMap<(Vec<u8>, usize), u32>>>,
}

impl PdfBackend for FakeDoc {
    fn page_count(&self) -> usize {
        self.spec.pages.len()
    }

    fn page_dimensions(&self, page: usize) -> AppResult<(f32, f32)> {
        self.spec
            .pages
            .get(page)
            .map(|(w, h)| (*w as f32, *h as f32))
            .ok_or(AppError::invalid_argument("page index is out of range"))
    }

    fn render_page(&self, page: usize, scale: f32) -> AppResult<RgbaFrame> {
        if self.spec.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.spec.delay_ms));
        }
        let (width, height) = self.page_dimensions(page)?;
        {
            let mut remaining = self
                .remaining_failures
                .lock()
                .expect("failure budget lock should not be poisoned");
            if let Some(left) = remaining.get_mut(&(self.key.clone(), page))
                && *left > 0
            {
                *left -= 1;
                return Err(AppError::unsupported("injected render failure"));
            }
        }

        let width = (width * scale).round() as u32;
        let height = (height * scale).round() as u32;
        let [r, g, b] = self.spec.fill;
        let pixels = [r, g, b, 255].repeat(width as usize * height as usize);
        Ok(RgbaFrame {
            width,
            height,
            pixels: pixels.into(),
        })
    }
}

pub(crate) fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
    let page_streams: Vec<String> = if page_texts.is_empty() {
        vec!["".to_string()]
    } else {
        page_texts
            .iter()
            .map(|text| {
                let escaped = escape_literal_string(text);
                format!("BT /F1 14 Tf 36 260 Td ({escaped}) Tj ET")
            })
            .collect()
    };

    build_pdf_from_streams(&page_streams)
}

fn build_pdf_from_streams(page_streams: &[String]) -> Vec<u8> {
    let page_count = page_streams.len();
    let page_ids: Vec<usize> = (0..page_count).map(|i| 4 + i * 2).collect();

    let mut objects = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());

    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!(
        "<< /Type /Pages /Kids [{kids}] /Count {page_count} >>"
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for (index, stream) in page_streams.iter().enumerate() {
        let content_id = 5 + index * 2;

        let page_obj = format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 300] /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
        );
        let content_obj = format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        );

        objects.push(page_obj);
        objects.push(content_obj);
    }

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::new();
    offsets.push(0_usize);
    for (index, object) in objects.iter().enumerate() {
        let object_id = index + 1;
        offsets.push(bytes.len());
        bytes.extend_from_slice(format!("{object_id} 0 obj\n{object}\nendobj\n").as_bytes());
    }

    let xref_start = bytes.len();
    bytes.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    bytes.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        bytes.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }

    bytes.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );

    bytes
}

fn escape_literal_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }

    out
}
