use super::{Engine, types::*};
use crate::{
    backend::{LopdfSource, PdfBackend, TextSource, build_text_pdf},
    config::{Config, RequestConfig},
    convert, probe, split,
    error::{AdapterError, AdapterResult},
    ocr::TesseractRunner,
    util::check_input_size,
};
use std::path::Path;
use tracing::{debug, warn};

const ENGINE_ID: &str = "lopdf+pdf-extract";
const DOCTOR_MARKER: &str = "quack doctor";

/// In-process engine over the Rust PDF stack.
pub struct NativeEngine {
    cfg: Config,
    probe_backend: PdfBackend,
}

impl NativeEngine {
    pub fn new(cfg: &Config) -> Self {
        let probe_backend = PdfBackend::parse(&cfg.probe.backend).unwrap_or_else(|name| {
            warn!("unknown probe.backend {name:?}; using AUTO");
            PdfBackend::Auto
        });
        Self {
            cfg: cfg.clone(),
            probe_backend,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    fn check_input(&self, input: &Path) -> AdapterResult<()> {
        let size = check_input_size(input, self.cfg.limits.max_input_file_bytes)?;
        debug!("input {} ({} bytes)", input.display(), size);
        Ok(())
    }
}

fn self_test() -> AdapterResult<String> {
    let bytes = build_text_pdf(&[DOCTOR_MARKER])?;
    let doc = lopdf::Document::load_mem(&bytes)
        .map_err(|e| AdapterError::source_read("<self-test>", e))?;
    LopdfSource::from_document(doc).page_text(1)
}

impl Engine for NativeEngine {
    fn doctor(&self) -> DocDiag {
        let exe = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let (ok, error) = match self_test() {
            Ok(text) if text.contains(DOCTOR_MARKER) => (true, None),
            Ok(text) => (false, Some(format!("self-test extracted {text:?}"))),
            Err(err) => (false, Some(err.to_string())),
        };
        DocDiag {
            python_exe: exe,
            python_version: env!("CARGO_PKG_VERSION").to_string(),
            docling_version: ok.then(|| ENGINE_ID.to_string()),
            ok,
            error,
            ocr_engine: TesseractRunner::version(&self.cfg.ocr.tesseract_exe),
        }
    }

    fn probe_pdf(&self, input: &Path, sample_pages: u32) -> ProbeOut {
        if let Err(err) = self.check_input(input) {
            return ProbeOut::empty(Some(err.to_string()));
        }
        probe::probe_pdf(self.probe_backend, input, sample_pages)
    }

    fn split_pdf(
        &self,
        input: &Path,
        out_dir: &Path,
        ranges: &[ChunkRequest],
    ) -> AdapterResult<Vec<SplitChunk>> {
        self.check_input(input)?;
        split::split_pdf(input, out_dir, ranges)
    }

    fn convert_structured(&self, req: &ConvertIn, cfg: &RequestConfig) -> AdapterResult<ConvertOut> {
        self.check_input(Path::new(&req.input_pdf))?;
        let out = convert::convert_structured(&self.cfg, req, cfg)?;
        if !out.warnings.is_empty() {
            warn!(
                "chunk {} converted with {} warnings",
                req.chunk_index,
                out.warnings.len()
            );
        }
        Ok(out)
    }

    fn convert_native_text(
        &self,
        req: &ConvertIn,
        cfg: &RequestConfig,
    ) -> AdapterResult<ConvertOut> {
        self.check_input(Path::new(&req.input_pdf))?;
        let out = convert::convert_native_text(req, cfg)?;
        if !out.ok {
            warn!("native text convert returned ok=false for chunk {}", req.chunk_index);
        }
        Ok(out)
    }
}
