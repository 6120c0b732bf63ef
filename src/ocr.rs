//! OCR engines. Only the tesseract family has a runner; it shells out to the
//! `tesseract` executable with one embedded page image at a time.

use crate::{
    backend::PageImage,
    error::{AdapterError, AdapterResult},
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrEngine {
    EasyOcr,
    Tesseract,
    TesseractCli,
}

impl OcrEngine {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "easyocr" => Some(Self::EasyOcr),
            "tesseract" => Some(Self::Tesseract),
            "tesseract_cli" => Some(Self::TesseractCli),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EasyOcr => "easyocr",
            Self::Tesseract => "tesseract",
            Self::TesseractCli => "tesseract_cli",
        }
    }

    /// Whether this build can run the engine at all.
    pub fn has_runner(&self) -> bool {
        !matches!(self, Self::EasyOcr)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    pub engine: OcrEngine,
    pub langs: Vec<String>,
    pub force_full_page_ocr: bool,
    pub force_ocr: bool,
    pub extra_args: Vec<String>,
}

/// Maps short language codes to tesseract's three-letter data names.
pub fn tesseract_lang(code: &str) -> String {
    match code {
        "en" => "eng",
        "de" => "deu",
        "fr" => "fra",
        "es" => "spa",
        "it" => "ita",
        "pt" => "por",
        "nl" => "nld",
        other => other,
    }
    .to_string()
}

pub struct TesseractRunner {
    exe: PathBuf,
    langs: String,
    extra_args: Vec<String>,
    tessdata_dir: Option<PathBuf>,
    thread_limit: Option<u32>,
}

impl TesseractRunner {
    pub fn new(
        exe: &str,
        opts: &OcrOptions,
        artifacts_path: Option<&Path>,
        thread_limit: Option<u32>,
    ) -> Self {
        let langs = opts
            .langs
            .iter()
            .map(|l| tesseract_lang(l))
            .collect::<Vec<_>>()
            .join("+");
        let tessdata_dir = artifacts_path
            .map(|p| p.join("tessdata"))
            .filter(|p| p.is_dir());
        Self {
            exe: PathBuf::from(exe),
            langs,
            extra_args: opts.extra_args.clone(),
            tessdata_dir,
            thread_limit,
        }
    }

    /// First line of `tesseract --version`, if the executable can be run.
    pub fn version(exe: &str) -> Option<String> {
        let output = Command::new(exe).arg("--version").output().ok()?;
        let raw = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        String::from_utf8_lossy(&raw)
            .lines()
            .next()
            .map(|l| l.trim().to_string())
    }

    /// Recognizes every image and joins the text with blank lines.
    pub fn recognize_page(
        &self,
        images: &[PageImage],
        timeout: Option<Duration>,
    ) -> AdapterResult<String> {
        let started = Instant::now();
        let mut parts = Vec::with_capacity(images.len());
        for image in images {
            let remaining = match timeout {
                Some(t) => Some(t.checked_sub(started.elapsed()).ok_or_else(|| {
                    AdapterError::Conversion(format!("ocr exceeded timeout ({t:?})"))
                })?),
                None => None,
            };
            let text = self.recognize(image, remaining)?;
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        Ok(parts.join("\n\n"))
    }

    fn recognize(&self, image: &PageImage, timeout: Option<Duration>) -> AdapterResult<String> {
        let mut file = tempfile::Builder::new()
            .prefix("quack-ocr-")
            .suffix(&format!(".{}", image.extension))
            .tempfile()
            .map_err(|e| AdapterError::Conversion(format!("ocr temp file: {e}")))?;
        file.write_all(&image.data)
            .map_err(|e| AdapterError::write(file.path(), e))?;

        let mut cmd = Command::new(&self.exe);
        cmd.arg(file.path()).arg("stdout");
        if !self.langs.is_empty() {
            cmd.arg("-l").arg(&self.langs);
        }
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.args(&self.extra_args);
        if let Some(n) = self.thread_limit {
            cmd.env("OMP_THREAD_LIMIT", n.to_string());
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!("tesseract {} timeout={:?}", file.path().display(), timeout);
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AdapterError::MissingDependency(format!(
                    "tesseract executable not found: {}",
                    self.exe.display()
                ))
            } else {
                AdapterError::Conversion(format!("spawning tesseract: {e}"))
            }
        })?;

        let output = match timeout {
            Some(t) => wait_with_timeout(&mut child, t)?,
            None => child
                .wait_with_output()
                .map_err(|e| AdapterError::Conversion(format!("waiting for tesseract: {e}")))?,
        };

        if !output.status.success() {
            return Err(AdapterError::Conversion(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> AdapterResult<Output> {
    // Drain pipes while waiting so a chatty engine can't block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).map(|_| buf)
        } else {
            Ok(buf)
        }
    });
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).map(|_| buf)
        } else {
            Ok(buf)
        }
    });

    let join = |h: std::thread::JoinHandle<std::io::Result<Vec<u8>>>, what: &str| {
        h.join()
            .map_err(|_| AdapterError::Conversion(format!("{what} reader thread panicked")))?
            .map_err(|e| AdapterError::Conversion(format!("read {what}: {e}")))
    };

    let start = Instant::now();
    loop {
        let polled = child
            .try_wait()
            .map_err(|e| AdapterError::Conversion(format!("try_wait: {e}")))?;
        if let Some(status) = polled {
            return Ok(Output {
                status,
                stdout: join(stdout_thread, "stdout")?,
                stderr: join(stderr_thread, "stderr")?,
            });
        }

        if start.elapsed() > timeout {
            warn!("tesseract timed out after {:?}", timeout);
            let _ = child.kill();
            let _ = child.wait();
            let stderr = join(stderr_thread, "stderr").unwrap_or_default();
            return Err(AdapterError::Conversion(format!(
                "ocr exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            )));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_round_trip() {
        for e in [OcrEngine::EasyOcr, OcrEngine::Tesseract, OcrEngine::TesseractCli] {
            assert_eq!(OcrEngine::parse(e.name()), Some(e));
        }
        assert_eq!(OcrEngine::parse("rapidocr"), None);
        assert!(!OcrEngine::EasyOcr.has_runner());
    }

    #[test]
    fn langs_map_to_tesseract_codes() {
        let opts = OcrOptions {
            engine: OcrEngine::TesseractCli,
            langs: vec!["en".into(), "deu".into()],
            force_full_page_ocr: false,
            force_ocr: false,
            extra_args: vec![],
        };
        let runner = TesseractRunner::new("tesseract", &opts, None, None);
        assert_eq!(runner.langs, "eng+deu");
    }

    #[test]
    fn missing_executable_is_a_missing_dependency() {
        let opts = OcrOptions {
            engine: OcrEngine::TesseractCli,
            langs: vec![],
            force_full_page_ocr: false,
            force_ocr: false,
            extra_args: vec![],
        };
        let runner = TesseractRunner::new("/nonexistent/tesseract-bin", &opts, None, None);
        let image = PageImage {
            data: vec![0xFF, 0xD8, 0xFF],
            extension: "jpg",
        };
        let err = runner.recognize_page(&[image], None).unwrap_err();
        assert!(matches!(err, AdapterError::MissingDependency(_)));
    }
}
