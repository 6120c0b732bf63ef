//! Translation of the declarative `cfg` record into [`ConversionOptions`].
//!
//! Every recognised option has an entry in [`OPTION_TABLE`]. A rule either
//! applies its value, reports that nothing was requested, or declares the
//! option unsupported by this conversion stack. Unsupported options are only
//! listed as ignored when the configuration actually asks for them.

use crate::{
    backend::PdfBackend,
    config::RequestConfig,
    engine::types::ConvertIn,
    ocr::{OcrEngine, OcrOptions},
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOptions {
    pub do_ocr: bool,
    pub force_backend_text: bool,
    pub document_timeout: Option<Duration>,
    pub max_num_pages: Option<u32>,
    pub max_file_size: Option<u64>,
    pub raises_on_error: bool,
    /// 1-based inclusive window, unvalidated.
    pub page_range: Option<(i64, i64)>,
    pub ocr: Option<OcrOptions>,
    pub ocr_threads: Option<u32>,
    pub artifacts_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Applied,
    Unset,
    Unsupported(&'static str),
}

pub type Rule = fn(&mut ConversionOptions, &RequestConfig, &ConvertIn) -> Setting;

pub struct OptionRule {
    pub name: &'static str,
    pub apply: Rule,
}

const NO_LAYOUT_MODEL: &str = "no layout model in the native stack";
const NO_IMAGE_OUTPUT: &str = "page images are not generated";
const SINGLE_THREADED: &str = "conversion runs single-threaded";
const OFFLINE: &str = "remote services are not available";

fn unsupported_if(requested: bool, reason: &'static str) -> Setting {
    if requested {
        Setting::Unsupported(reason)
    } else {
        Setting::Unset
    }
}

fn ocr_active(o: &ConversionOptions) -> bool {
    o.ocr.is_some()
}

pub static OPTION_TABLE: &[OptionRule] = &[
    OptionRule {
        name: "do_ocr",
        apply: |o, _, req| {
            o.do_ocr = req.do_ocr;
            Setting::Applied
        },
    },
    OptionRule {
        name: "force_backend_text",
        apply: |o, cfg, _| {
            o.force_backend_text = cfg.conversion.pipeline.force_backend_text;
            Setting::Applied
        },
    },
    OptionRule {
        name: "do_table_structure",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.do_table_structure, NO_LAYOUT_MODEL),
    },
    OptionRule {
        name: "do_code_enrichment",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.do_code_enrichment, NO_LAYOUT_MODEL),
    },
    OptionRule {
        name: "do_formula_enrichment",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.do_formula_enrichment, NO_LAYOUT_MODEL)
        },
    },
    OptionRule {
        name: "do_picture_description",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.do_picture_description, NO_LAYOUT_MODEL)
        },
    },
    OptionRule {
        name: "do_picture_classification",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.do_picture_classification, NO_LAYOUT_MODEL)
        },
    },
    OptionRule {
        name: "generate_page_images",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.generate_page_images, NO_IMAGE_OUTPUT),
    },
    OptionRule {
        name: "generate_picture_images",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.generate_picture_images, NO_IMAGE_OUTPUT)
        },
    },
    OptionRule {
        name: "generate_table_images",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.generate_table_images, NO_IMAGE_OUTPUT),
    },
    OptionRule {
        name: "generate_parsed_pages",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.generate_parsed_pages, NO_LAYOUT_MODEL),
    },
    OptionRule {
        name: "create_legacy_output",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.create_legacy_output, NO_LAYOUT_MODEL),
    },
    OptionRule {
        name: "enable_remote_services",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.enable_remote_services, OFFLINE),
    },
    OptionRule {
        name: "allow_external_plugins",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.allow_external_plugins, OFFLINE),
    },
    OptionRule {
        name: "document_timeout",
        apply: |o, cfg, _| match cfg.conversion.pipeline.document_timeout_seconds {
            0 => Setting::Unset,
            secs => {
                o.document_timeout = Some(Duration::from_secs(secs));
                Setting::Applied
            }
        },
    },
    OptionRule {
        name: "images_scale",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.images_scale.is_some(), NO_IMAGE_OUTPUT)
        },
    },
    OptionRule {
        name: "use_threaded_pipeline",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.use_threaded_pipeline, SINGLE_THREADED),
    },
    OptionRule {
        name: "queue_max_size",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.queue_max_size.is_some(), SINGLE_THREADED)
        },
    },
    OptionRule {
        name: "num_threads",
        apply: |_, cfg, _| unsupported_if(cfg.conversion.pipeline.num_threads.is_some(), SINGLE_THREADED),
    },
    OptionRule {
        name: "layout_batch_size",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.layout_batch_size.is_some(), SINGLE_THREADED)
        },
    },
    OptionRule {
        name: "table_batch_size",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.table_batch_size.is_some(), SINGLE_THREADED)
        },
    },
    OptionRule {
        name: "picture_batch_size",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.picture_batch_size.is_some(), SINGLE_THREADED)
        },
    },
    OptionRule {
        name: "page_batch_size",
        apply: |_, cfg, _| {
            unsupported_if(cfg.conversion.pipeline.page_batch_size.is_some(), SINGLE_THREADED)
        },
    },
    OptionRule {
        name: "ocr_options",
        apply: |o, cfg, _| {
            if !o.do_ocr || o.force_backend_text {
                return Setting::Unset;
            }
            let ocr = &cfg.conversion.ocr;
            match OcrEngine::parse(&ocr.engine) {
                None => Setting::Unsupported("unknown ocr engine"),
                Some(engine) if !engine.has_runner() => Setting::Unsupported("no runner for this engine"),
                Some(engine) => {
                    o.ocr = Some(OcrOptions {
                        engine,
                        langs: Vec::new(),
                        force_full_page_ocr: false,
                        force_ocr: false,
                        extra_args: Vec::new(),
                    });
                    Setting::Applied
                }
            }
        },
    },
    OptionRule {
        name: "lang",
        apply: |o, cfg, _| match o.ocr.as_mut() {
            Some(ocr) if !cfg.conversion.ocr.langs.is_empty() => {
                ocr.langs = cfg.conversion.ocr.langs.clone();
                Setting::Applied
            }
            _ => Setting::Unset,
        },
    },
    OptionRule {
        name: "bitmap_area_threshold",
        apply: |o, cfg, _| {
            unsupported_if(
                ocr_active(o) && cfg.conversion.ocr.bitmap_area_threshold > 0.0,
                "every embedded page image is recognised",
            )
        },
    },
    OptionRule {
        name: "force_full_page_ocr",
        apply: |o, cfg, _| match o.ocr.as_mut() {
            Some(ocr) => {
                ocr.force_full_page_ocr = cfg.conversion.ocr.force_full_page_ocr;
                Setting::Applied
            }
            None => Setting::Unset,
        },
    },
    OptionRule {
        name: "force_ocr",
        apply: |o, cfg, _| match o.ocr.as_mut() {
            Some(ocr) => {
                ocr.force_ocr = cfg.conversion.ocr.force_ocr;
                Setting::Applied
            }
            None => Setting::Unset,
        },
    },
    OptionRule {
        name: "tesseract_args",
        apply: |o, cfg, _| {
            let raw = cfg.conversion.ocr.tesseract_cli_args.trim();
            match o.ocr.as_mut() {
                Some(ocr) if !raw.is_empty() => {
                    ocr.extra_args = raw.split_whitespace().map(str::to_string).collect();
                    Setting::Applied
                }
                _ => Setting::Unset,
            }
        },
    },
    OptionRule {
        name: "device",
        apply: |_, cfg, _| {
            let device = cfg.conversion.accelerator.device.trim();
            unsupported_if(
                !device.is_empty() && !device.eq_ignore_ascii_case("AUTO"),
                "ocr runs on the cpu",
            )
        },
    },
    OptionRule {
        name: "inference_threads",
        apply: |o, cfg, _| match cfg.conversion.accelerator.inference_threads {
            0 => Setting::Unset,
            n => {
                o.ocr_threads = Some(n);
                Setting::Applied
            }
        },
    },
    OptionRule {
        name: "artifacts_path",
        apply: |o, cfg, _| {
            let dir = cfg.paths.artifacts_dir.trim();
            if dir.is_empty() {
                Setting::Unset
            } else {
                o.artifacts_path = Some(PathBuf::from(dir));
                Setting::Applied
            }
        },
    },
    OptionRule {
        name: "max_num_pages",
        apply: |o, cfg, _| match cfg.conversion.max_num_pages {
            0 => Setting::Unset,
            n => {
                o.max_num_pages = Some(n);
                Setting::Applied
            }
        },
    },
    OptionRule {
        name: "max_file_size",
        apply: |o, cfg, _| match cfg.conversion.max_file_size_bytes {
            0 => Setting::Unset,
            n => {
                o.max_file_size = Some(n);
                Setting::Applied
            }
        },
    },
    OptionRule {
        name: "raises_on_error",
        apply: |o, cfg, _| {
            o.raises_on_error = cfg.conversion.raises_on_error;
            Setting::Applied
        },
    },
    OptionRule {
        name: "page_range",
        apply: |o, _, req| {
            if req.use_page_range {
                o.page_range = Some((req.start_page, req.end_page));
                Setting::Applied
            } else {
                Setting::Unset
            }
        },
    },
];

#[derive(Debug, Clone)]
pub struct Translation {
    pub options: ConversionOptions,
    pub backend: PdfBackend,
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn translate(cfg: &RequestConfig, req: &ConvertIn) -> Translation {
    let mut effective = cfg.clone();
    if effective.global.offline_only {
        effective.conversion.pipeline.enable_remote_services = false;
        effective.conversion.pipeline.allow_external_plugins = false;
    }

    let mut options = ConversionOptions::default();
    let mut applied = Vec::new();
    let mut ignored = Vec::new();
    let mut warnings = Vec::new();

    for rule in OPTION_TABLE {
        match (rule.apply)(&mut options, &effective, req) {
            Setting::Applied => applied.push(rule.name.to_string()),
            Setting::Unset => {}
            Setting::Unsupported(reason) => ignored.push(format!("{} ({reason})", rule.name)),
        }
    }

    if options.do_ocr && !options.force_backend_text && options.ocr.is_none() {
        warnings.push(format!(
            "ocr engine '{}' is not available; converting text layer only",
            effective.conversion.ocr.engine
        ));
    }

    let backend = match PdfBackend::parse(&req.pdf_backend) {
        Ok(b) => b,
        Err(name) => {
            ignored.push(format!("pdf_backend ({name} unsupported; using AUTO)"));
            PdfBackend::Auto
        }
    };

    Translation {
        options,
        backend,
        applied,
        ignored,
        warnings,
    }
}
