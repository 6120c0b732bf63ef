use crate::{
    backend::{PdfBackend, TextSource},
    chunk_plan::PageRange,
    config::{Config, RequestConfig},
    engine::types::{ConvertIn, ConvertOut},
    error::{AdapterError, AdapterResult},
    ocr::TesseractRunner,
    options::translate,
    postprocess::{join_pages, normalize_text},
    util::{ensure_dir, now_rfc3339},
};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Structured conversion: translated options, selectable backend, optional OCR.
pub fn convert_structured(
    engine_cfg: &Config,
    req: &ConvertIn,
    cfg: &RequestConfig,
) -> AdapterResult<ConvertOut> {
    let started = Instant::now();
    ensure_dir(Path::new(&req.out_dir))?;

    let translation = translate(cfg, req);
    let opts = &translation.options;
    let mut warnings = translation.warnings.clone();
    debug!(
        applied = ?translation.applied,
        ignored = ?translation.ignored,
        "translated conversion options"
    );

    let input = Path::new(&req.input_pdf);
    if let Some(max) = opts.max_file_size {
        let size = std::fs::metadata(input)
            .map_err(|e| AdapterError::source_read(input, e))?
            .len();
        if size > max {
            return Err(AdapterError::Conversion(format!(
                "file size {size} exceeds max_file_size {max}"
            )));
        }
    }

    let source = translation.backend.open(input)?;
    let page_count = source.page_count();
    if let Some(max) = opts.max_num_pages {
        if page_count > max {
            return Err(AdapterError::Conversion(format!(
                "page count {page_count} exceeds max_num_pages {max}"
            )));
        }
    }

    let range = match opts.page_range {
        Some((start, end)) => PageRange::validate(start, end, page_count)?,
        None => PageRange::whole(page_count),
    };

    let mut runner = opts.ocr.as_ref().map(|o| {
        TesseractRunner::new(
            &engine_cfg.ocr.tesseract_exe,
            o,
            opts.artifacts_path.as_deref(),
            opts.ocr_threads,
        )
    });
    if runner.is_some() && source.backend() == PdfBackend::PdfExtract {
        warnings.push("ocr needs page images; PDF_EXTRACT backend provides none".to_string());
        runner = None;
    }
    let force_ocr = opts
        .ocr
        .as_ref()
        .is_some_and(|o| o.force_ocr || o.force_full_page_ocr);

    let mut pages = Vec::with_capacity(range.len() as usize);
    let mut ocr_pages = 0u32;
    for page in range.pages() {
        if let Some(limit) = opts.document_timeout {
            if started.elapsed() > limit {
                let msg = format!(
                    "document timeout ({}s) reached at page {page}; remaining pages skipped",
                    limit.as_secs()
                );
                if opts.raises_on_error {
                    return Err(AdapterError::Conversion(msg));
                }
                warn!("{msg}");
                warnings.push(msg);
                break;
            }
        }

        let mut text = match source.page_text(page) {
            Ok(t) => t,
            Err(err) if opts.raises_on_error => return Err(err),
            Err(err) => {
                warnings.push(err.to_string());
                String::new()
            }
        };

        if let Some(ocr) = runner.as_ref() {
            if force_ocr || text.trim().is_empty() {
                let images = source.page_images(page);
                let remaining = opts
                    .document_timeout
                    .map(|limit| limit.saturating_sub(started.elapsed()));
                if !images.is_empty() {
                    match ocr.recognize_page(&images, remaining) {
                        Ok(ocr_text) => {
                            ocr_pages += 1;
                            if !ocr_text.trim().is_empty() {
                                text = ocr_text;
                            }
                        }
                        Err(err) if opts.raises_on_error => return Err(err),
                        Err(AdapterError::MissingDependency(msg)) => {
                            warn!("{msg}; disabling ocr");
                            warnings.push(format!("{msg}; ocr disabled"));
                            runner = None;
                        }
                        Err(err) => warnings.push(format!("page {page}: ocr failed: {err}")),
                    }
                }
            }
        }

        pages.push(text.trim_end().to_string());
    }

    let markdown = pages.join("\n\n");
    info!(
        "converted chunk {} pages {}-{} ({} ocr) in {:?}",
        req.chunk_index,
        range.start_page,
        range.end_page,
        ocr_pages,
        started.elapsed()
    );

    let meta = serde_json::json!({
        "chunk_index": req.chunk_index,
        "start_page": req.start_page,
        "end_page": req.end_page,
        "applied_flags": translation.applied,
        "ignored_flags": translation.ignored,
        "pdf_backend": req.pdf_backend,
        "use_page_range": req.use_page_range,
        "engine": source.backend().name(),
        "pages_converted": pages.len(),
        "ocr_pages": ocr_pages,
        "elapsed_ms": started.elapsed().as_millis() as u64,
        "generated_at": now_rfc3339(),
    });

    Ok(ConvertOut {
        ok: true,
        markdown,
        warnings,
        meta,
    })
}

/// Text-layer conversion with normalization.
///
/// A window that does not fit the document is widened to the whole document
/// when it looks like original page numbers applied to a split chunk.
pub fn convert_native_text(req: &ConvertIn, cfg: &RequestConfig) -> AdapterResult<ConvertOut> {
    let native = &cfg.native_text;
    let input = Path::new(&req.input_pdf);
    let source = PdfBackend::Auto.open(input)?;
    let page_count = source.page_count();

    let mut warnings = Vec::new();
    let range = match PageRange::validate(req.start_page, req.end_page, page_count) {
        Ok(r) => r,
        Err(_) if page_count > 0 && req.start_page > 1 && !native.strict_page_range => {
            let msg = format!(
                "invalid page range {}-{} for split chunk (pages={page_count}); falling back to 1-{page_count}",
                req.start_page, req.end_page
            );
            warn!("{msg}");
            warnings.push(msg);
            PageRange::whole(page_count)
        }
        Err(_) => {
            return Ok(ConvertOut::failed(format!(
                "invalid page range: {}-{} (pages={page_count})",
                req.start_page, req.end_page
            )));
        }
    };

    let pages = collect_pages(source.as_ref(), &range, &mut warnings)
        .into_iter()
        .map(|(page, text)| (page, normalize_text(&text, native)))
        .collect::<Vec<_>>();

    Ok(ConvertOut {
        ok: true,
        markdown: join_pages(&pages, native.light_markdown),
        warnings,
        meta: serde_json::json!({
            "start_page": range.start_page,
            "end_page": range.end_page,
            "engine": "native_text",
        }),
    })
}

fn collect_pages(
    source: &dyn TextSource,
    range: &PageRange,
    warnings: &mut Vec<String>,
) -> Vec<(u32, String)> {
    range
        .pages()
        .map(|page| match source.page_text(page) {
            Ok(text) => (page, text),
            Err(err) => {
                warnings.push(err.to_string());
                (page, String::new())
            }
        })
        .collect()
}
