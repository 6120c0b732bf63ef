use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of the adapter process itself, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub probe: Probe,
    #[serde(default)]
    pub ocr: Ocr,
    #[serde(default)]
    pub limits: Limits,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    pub default_sample_pages: u32,
    pub backend: String,
}
impl Default for Probe {
    fn default() -> Self {
        Self {
            default_sample_pages: 12,
            backend: "AUTO".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocr {
    pub tesseract_exe: String,
}
impl Default for Ocr {
    fn default() -> Self {
        Self {
            tesseract_exe: "tesseract".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Inputs above this size are refused by every adapter. 0 disables the check.
    pub max_input_file_bytes: u64,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 2 * 1024 * 1024 * 1024,
        }
    }
}

/// The `cfg` record a caller ships with each convert request.
///
/// Mirrors the orchestrator's configuration sections this crate consumes;
/// unknown keys are ignored and every section falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub global: Global,
    pub paths: Paths,
    pub native_text: NativeText,
    #[serde(rename = "docling")]
    pub conversion: Conversion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub offline_only: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self { offline_only: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Model/data directory handed to the OCR engine. Empty means unset.
    #[serde(rename = "docling_artifacts_dir")]
    pub artifacts_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeText {
    pub normalize_unicode: bool,
    pub collapse_whitespace: bool,
    pub fix_hyphenation: bool,
    pub light_markdown: bool,
    /// Reject out-of-range windows instead of widening them to the whole chunk.
    pub strict_page_range: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversion {
    pub max_num_pages: u32,
    pub max_file_size_bytes: u64,
    pub raises_on_error: bool,
    pub pipeline: Pipeline,
    pub ocr: OcrSettings,
    pub accelerator: Accelerator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub force_backend_text: bool,
    pub do_table_structure: bool,
    pub do_code_enrichment: bool,
    pub do_formula_enrichment: bool,
    pub do_picture_description: bool,
    pub do_picture_classification: bool,
    pub generate_page_images: bool,
    pub generate_picture_images: bool,
    pub generate_table_images: bool,
    pub generate_parsed_pages: bool,
    pub create_legacy_output: bool,
    pub document_timeout_seconds: u64,
    pub enable_remote_services: bool,
    pub allow_external_plugins: bool,
    pub use_threaded_pipeline: bool,
    pub num_threads: Option<u32>,
    pub queue_max_size: Option<u32>,
    pub layout_batch_size: Option<u32>,
    pub table_batch_size: Option<u32>,
    pub picture_batch_size: Option<u32>,
    pub page_batch_size: Option<u32>,
    pub images_scale: Option<f32>,
}
impl Default for Pipeline {
    fn default() -> Self {
        Self {
            force_backend_text: false,
            do_table_structure: true,
            do_code_enrichment: false,
            do_formula_enrichment: false,
            do_picture_description: false,
            do_picture_classification: false,
            generate_page_images: false,
            generate_picture_images: false,
            generate_table_images: false,
            generate_parsed_pages: false,
            create_legacy_output: false,
            document_timeout_seconds: 0,
            enable_remote_services: false,
            allow_external_plugins: false,
            use_threaded_pipeline: false,
            num_threads: None,
            queue_max_size: None,
            layout_batch_size: None,
            table_batch_size: None,
            picture_batch_size: None,
            page_batch_size: None,
            images_scale: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub engine: String,
    pub langs: Vec<String>,
    pub force_full_page_ocr: bool,
    pub bitmap_area_threshold: f32,
    pub force_ocr: bool,
    pub tesseract_cli_args: String,
}
impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            engine: "easyocr".into(),
            langs: vec!["en".into()],
            force_full_page_ocr: false,
            bitmap_area_threshold: 0.25,
            force_ocr: false,
            tesseract_cli_args: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Accelerator {
    pub device: String,
    pub inference_threads: u32,
    pub use_fp16: bool,
}
impl Default for Accelerator {
    fn default() -> Self {
        Self {
            device: "AUTO".into(),
            inference_threads: 0,
            use_fp16: true,
        }
    }
}
