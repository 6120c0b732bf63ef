use serde::{Deserialize, Serialize};

/// Doctor report. Key names are the ones the orchestrator already parses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDiag {
    pub python_exe: String,
    pub python_version: String,
    pub docling_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ocr_engine: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeIn {
    pub input_pdf: String,
    #[serde(default)]
    pub sample_pages: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOut {
    pub page_count: u32,
    pub sampled_pages: u32,
    pub avg_chars_per_page: u32,
    pub garbage_ratio: f32,
    pub whitespace_ratio: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeOut {
    /// Saturated "no usable text" result.
    pub fn empty(error: Option<String>) -> Self {
        Self {
            page_count: 0,
            sampled_pages: 0,
            avg_chars_per_page: 0,
            garbage_ratio: 1.0,
            whitespace_ratio: 1.0,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertIn {
    pub input_pdf: String,
    pub out_dir: String,
    pub chunk_index: u32,
    #[serde(default = "first_page")]
    pub start_page: i64,
    #[serde(default = "first_page")]
    pub end_page: i64,
    #[serde(default)]
    pub do_ocr: bool,
    #[serde(default = "auto_backend")]
    pub pdf_backend: String,
    #[serde(default)]
    pub use_page_range: bool,
}

fn first_page() -> i64 {
    1
}

fn auto_backend() -> String {
    "AUTO".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertOut {
    pub ok: bool,
    pub markdown: String,
    pub warnings: Vec<String>,
    pub meta: serde_json::Value,
}

impl ConvertOut {
    pub fn failed(warning: impl Into<String>) -> Self {
        Self {
            ok: false,
            markdown: String::new(),
            warnings: vec![warning.into()],
            meta: serde_json::json!({}),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitIn {
    pub input_pdf: String,
    pub out_dir: String,
    #[serde(default)]
    pub chunks: Vec<ChunkRequest>,
}

/// A requested range as the caller sent it; validated by the partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRequest {
    pub start_page: i64,
    pub end_page: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitChunk {
    pub chunk_index: u32,
    pub start_page: u32,
    pub end_page: u32,
    pub path: String,
    #[serde(default)]
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOut {
    pub ok: bool,
    #[serde(default)]
    pub outputs: Vec<SplitChunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SplitOut {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            outputs: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// `{"cmd": ..., "req": ..., "cfg": ...}` as sent to the `runner` and `text` adapters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandPayload {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub req: serde_json::Value,
    #[serde(default)]
    pub cfg: serde_json::Value,
}
