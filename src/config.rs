use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, AppResult};

const MAX_LABEL_SCALE: u32 = 16;

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub tool: ToolConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub worker_threads: usize,
    /// Multiplier applied to the intrinsic page size when sizing both surfaces.
    pub scale: f32,
    /// Upper bound for `scale`; larger values are clamped down to it.
    pub max_render_scale: f32,
    pub retry_failed_pages: u8,
    /// Baseline of the page label, measured from the bottom-left corner.
    pub label_offset: [u32; 2],
    pub label_scale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            worker_threads: 3,
            scale: 1.5,
            max_render_scale: 4.0,
            retry_failed_pages: 1,
            label_offset: [10, 10],
            label_scale: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    pub stamp_size: f32,
    pub erase_size: f32,
    pub erase_offset: [f32; 2],
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            stamp_size: 20.0,
            erase_size: 20.0,
            erase_offset: [2.0, 2.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Uniform output page width in PDF points.
    pub page_width: f32,
    pub file_name: String,
    pub wait_for_pages: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width: 595.0,
            file_name: "mosaic.pdf".to_string(),
            wait_for_pages: true,
        }
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(AppError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            AppError::io_with_context(source, format!("failed to read config: {}", path.display()))
        })?;
        let parsed = toml::from_str::<Self>(&raw).map_err(|source| {
            AppError::invalid_argument(format!(
                "failed to parse config {}: {source}",
                path.display()
            ))
        })?;
        Ok(parsed.sanitized())
    }

    fn sanitized(mut self) -> Self {
        let render_defaults = RenderConfig::default();
        let tool_defaults = ToolConfig::default();

        self.render.worker_threads = self.render.worker_threads.max(1);
        self.render.label_scale = self.render.label_scale.clamp(1, MAX_LABEL_SCALE);
        if !self.render.max_render_scale.is_finite() || self.render.max_render_scale < 1.0 {
            self.render.max_render_scale = render_defaults.max_render_scale;
        }
        if !self.render.scale.is_finite() || self.render.scale < 0.1 {
            self.render.scale = render_defaults.scale;
        }
        self.render.scale = self.render.scale.min(self.render.max_render_scale);
        if !positive_finite(self.tool.stamp_size) {
            self.tool.stamp_size = tool_defaults.stamp_size;
        }
        if !positive_finite(self.tool.erase_size) {
            self.tool.erase_size = tool_defaults.erase_size;
        }
        if !self.tool.erase_offset.iter().all(|v| v.is_finite()) {
            self.tool.erase_offset = tool_defaults.erase_offset;
        }
        if !positive_finite(self.export.page_width) {
            self.export.page_width = ExportConfig::default().page_width;
        }
        if self.export.file_name.trim().is_empty() {
            self.export.file_name = ExportConfig::default().file_name;
        }
        self
    }
}

fn positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("MPDF_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("mpdf").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("mpdf")
                .join("config.toml"),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("mpdf").join("config.toml"));
    }
    None
}
