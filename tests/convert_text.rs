mod common;

use quack_adapters::{
    adapters::{Runner, TextConverter},
    config::{Config, RequestConfig},
    engine::{ConvertIn, Engine, NativeEngine},
    envelope::respond,
};
use serde_json::{Value, json};
use std::path::Path;

fn engine() -> NativeEngine {
    NativeEngine::new(&Config::default())
}

fn request(input: &Path, out_dir: &Path, start_page: i64, end_page: i64) -> ConvertIn {
    ConvertIn {
        input_pdf: input.display().to_string(),
        out_dir: out_dir.display().to_string(),
        chunk_index: 0,
        start_page,
        end_page,
        do_ocr: false,
        pdf_backend: "AUTO".into(),
        use_page_range: false,
    }
}

#[test]
fn original_page_numbers_on_a_chunk_widen_to_whole_chunk() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "chunk.pdf", 3);

    let out = engine()
        .convert_native_text(&request(&input, tmp.path(), 11, 13), &RequestConfig::default())
        .unwrap();
    assert!(out.ok);
    assert_eq!(
        out.warnings,
        vec!["invalid page range 11-13 for split chunk (pages=3); falling back to 1-3".to_string()]
    );
    assert_eq!(out.meta, json!({"start_page": 1, "end_page": 3, "engine": "native_text"}));
    for i in 1..=3 {
        assert!(out.markdown.contains(&format!("Page {i}")));
    }
}

#[test]
fn strict_page_range_refuses_to_widen() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "chunk.pdf", 3);
    let mut cfg = RequestConfig::default();
    cfg.native_text.strict_page_range = true;

    let out = engine()
        .convert_native_text(&request(&input, tmp.path(), 11, 13), &cfg)
        .unwrap();
    assert!(!out.ok);
    assert_eq!(out.warnings, vec!["invalid page range: 11-13 (pages=3)".to_string()]);
}

#[test]
fn window_starting_at_one_is_never_widened() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "in.pdf", 3);

    let out = engine()
        .convert_native_text(&request(&input, tmp.path(), 1, 5), &RequestConfig::default())
        .unwrap();
    assert!(!out.ok);
    assert_eq!(out.markdown, "");
    assert_eq!(out.warnings, vec!["invalid page range: 1-5 (pages=3)".to_string()]);
}

#[test]
fn light_markdown_adds_page_headings() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::write_pdf(tmp.path(), "in.pdf", &["first", "second", "third"]);
    let mut cfg = RequestConfig::default();
    cfg.native_text.light_markdown = true;
    cfg.native_text.collapse_whitespace = true;

    let out = engine()
        .convert_native_text(&request(&input, tmp.path(), 2, 3), &cfg)
        .unwrap();
    assert!(out.ok);
    assert!(out.markdown.starts_with("## Page 2\n\nsecond"));
    assert!(out.markdown.contains("\n\n## Page 3\n\nthird"));
    assert!(!out.markdown.contains("first"));
}

#[test]
fn text_adapter_round_trip_through_json() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "in.pdf", 2);
    let raw = json!({
        "cmd": "convert",
        "req": {
            "input_pdf": input,
            "out_dir": tmp.path(),
            "chunk_index": 4,
            "start_page": 2,
            "end_page": 2,
        },
        "cfg": null,
    })
    .to_string();

    let out = respond(&TextConverter::new(engine()), &raw);
    assert!(out.ok, "{:?}", out.warnings);
    assert!(out.markdown.contains("Page 2"));
    assert!(!out.markdown.contains("Page 1"));
}

#[test]
fn structured_convert_reports_translated_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "in.pdf", 5);
    let out_dir = tmp.path().join("out");
    let mut req = request(&input, &out_dir, 2, 4);
    req.use_page_range = true;
    req.chunk_index = 7;

    let out = engine()
        .convert_structured(&req, &RequestConfig::default())
        .unwrap();
    assert!(out.ok);
    assert!(out_dir.is_dir());
    assert_eq!(out.markdown.matches("Page").count(), 3);
    assert!(out.markdown.contains("Page 2"));
    assert!(!out.markdown.contains("Page 5"));

    let meta = &out.meta;
    assert_eq!(meta["chunk_index"], json!(7));
    assert_eq!(meta["use_page_range"], json!(true));
    assert_eq!(meta["pages_converted"], json!(3));
    assert_eq!(meta["engine"], json!("LOPDF"));
    assert!(meta["generated_at"].is_string());
    let applied: Vec<&str> = meta["applied_flags"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(applied.contains(&"page_range"));
    assert!(
        meta["ignored_flags"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v.as_str().is_some_and(|s| s.starts_with("do_table_structure")))
    );
}

#[test]
fn structured_convert_without_page_range_covers_whole_chunk() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "in.pdf", 4);
    let req = request(&input, tmp.path(), 40, 43);

    let out = engine()
        .convert_structured(&req, &RequestConfig::default())
        .unwrap();
    assert!(out.ok);
    assert_eq!(out.meta["pages_converted"], json!(4));
    assert_eq!(out.meta["start_page"], json!(40));
}

#[test]
fn runner_convert_with_bad_page_range_fails_softly() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "in.pdf", 2);
    let raw = json!({
        "cmd": "convert",
        "req": {
            "input_pdf": input,
            "out_dir": tmp.path().join("out"),
            "chunk_index": 0,
            "start_page": 2,
            "end_page": 9,
            "use_page_range": true,
        },
        "cfg": {"docling": {"max_num_pages": 100}},
    })
    .to_string();

    let out = serde_json::to_value(respond(&Runner::new(engine()), &raw)).unwrap();
    assert_eq!(out["ok"], json!(false));
    assert_eq!(out["warnings"], json!(["invalid chunk range: 2-9 (pages=2)"]));
}

#[test]
fn page_limit_is_enforced() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "in.pdf", 6);
    let mut cfg = RequestConfig::default();
    cfg.conversion.max_num_pages = 5;

    let err = engine()
        .convert_structured(&request(&input, tmp.path(), 1, 6), &cfg)
        .unwrap_err();
    assert_eq!(err.to_string(), "conversion failed: page count 6 exceeds max_num_pages 5");
}

fn ocr_engine(tesseract_exe: &Path) -> NativeEngine {
    let mut cfg = Config::default();
    cfg.ocr.tesseract_exe = tesseract_exe.display().to_string();
    NativeEngine::new(&cfg)
}

fn ocr_config() -> RequestConfig {
    let mut cfg = RequestConfig::default();
    cfg.conversion.ocr.engine = "tesseract_cli".into();
    cfg
}

fn ocr_request(input: &Path, out_dir: &Path) -> ConvertIn {
    let mut req = request(input, out_dir, 1, 1);
    req.do_ocr = true;
    req
}

#[test]
fn missing_tesseract_disables_ocr_once() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::image_pdf(tmp.path(), "scan.pdf", &["", "", ""]);
    let engine = ocr_engine(&tmp.path().join("no-such-tesseract"));

    let out = engine
        .convert_structured(&ocr_request(&input, tmp.path()), &ocr_config())
        .unwrap();
    assert!(out.ok);
    let disabled: Vec<&String> = out
        .warnings
        .iter()
        .filter(|w| w.contains("ocr disabled"))
        .collect();
    assert_eq!(disabled.len(), 1, "{:?}", out.warnings);
    assert!(disabled[0].contains("tesseract executable not found"));
    assert_eq!(out.meta["ocr_pages"], json!(0));
    assert_eq!(out.meta["pages_converted"], json!(3));
}

#[test]
fn pdf_extract_backend_cannot_feed_ocr() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::numbered_pdf(tmp.path(), "in.pdf", 2);
    let mut req = ocr_request(&input, tmp.path());
    req.pdf_backend = "PDF_EXTRACT".into();

    let out = engine().convert_structured(&req, &ocr_config()).unwrap();
    assert!(out.ok);
    assert!(
        out.warnings
            .iter()
            .any(|w| w == "ocr needs page images; PDF_EXTRACT backend provides none")
    );
    assert_eq!(out.meta["engine"], json!("PDF_EXTRACT"));
    assert_eq!(out.meta["ocr_pages"], json!(0));
}

#[cfg(unix)]
#[test]
fn ocr_text_fills_blank_pages_only() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::image_pdf(tmp.path(), "scan.pdf", &["", "native words", ""]);
    let exe = common::fake_tesseract(tmp.path(), "echo recognized words");

    let out = ocr_engine(&exe)
        .convert_structured(&ocr_request(&input, tmp.path()), &ocr_config())
        .unwrap();
    assert!(out.ok, "{:?}", out.warnings);
    assert_eq!(out.meta["ocr_pages"], json!(2));
    assert_eq!(out.markdown.matches("recognized words").count(), 2);
    assert!(out.markdown.contains("native words"));
}

#[cfg(unix)]
#[test]
fn forced_ocr_replaces_the_text_layer() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::image_pdf(tmp.path(), "scan.pdf", &["", "native words"]);
    let exe = common::fake_tesseract(tmp.path(), "echo recognized words");

    for force in ["force_ocr", "force_full_page_ocr"] {
        let mut cfg = ocr_config();
        match force {
            "force_ocr" => cfg.conversion.ocr.force_ocr = true,
            _ => cfg.conversion.ocr.force_full_page_ocr = true,
        }
        let out = ocr_engine(&exe)
            .convert_structured(&ocr_request(&input, tmp.path()), &cfg)
            .unwrap();
        assert!(out.ok, "{force}: {:?}", out.warnings);
        assert_eq!(out.meta["ocr_pages"], json!(2), "{force}");
        assert_eq!(out.markdown.matches("recognized words").count(), 2, "{force}");
        assert!(!out.markdown.contains("native words"), "{force}");
    }
}

#[cfg(unix)]
#[test]
fn exhausted_document_timeout_skips_remaining_pages() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::image_pdf(tmp.path(), "scan.pdf", &["", "", ""]);
    let exe = common::fake_tesseract(tmp.path(), "exec sleep 5");
    let mut cfg = ocr_config();
    cfg.conversion.pipeline.document_timeout_seconds = 1;

    let out = ocr_engine(&exe)
        .convert_structured(&ocr_request(&input, tmp.path()), &cfg)
        .unwrap();
    assert!(out.ok);
    assert!(
        out.warnings
            .iter()
            .any(|w| w.starts_with("page 1: ocr failed") && w.contains("timeout")),
        "{:?}",
        out.warnings
    );
    assert!(
        out.warnings
            .iter()
            .any(|w| w == "document timeout (1s) reached at page 2; remaining pages skipped"),
        "{:?}",
        out.warnings
    );
    assert_eq!(out.meta["pages_converted"], json!(1));
}

#[cfg(unix)]
#[test]
fn exhausted_document_timeout_fails_when_raising() {
    let tmp = tempfile::tempdir().unwrap();
    let input = common::image_pdf(tmp.path(), "scan.pdf", &["", "", ""]);
    let exe = common::fake_tesseract(tmp.path(), "exec sleep 5");
    let mut cfg = ocr_config();
    cfg.conversion.pipeline.document_timeout_seconds = 1;
    cfg.conversion.raises_on_error = true;

    let raw = json!({
        "cmd": "convert",
        "req": ocr_request(&input, tmp.path()),
        "cfg": cfg,
    })
    .to_string();
    let out = serde_json::to_value(respond(&Runner::new(ocr_engine(&exe)), &raw)).unwrap();
    assert_eq!(out["ok"], json!(false));
    let warning = out["warnings"][0].as_str().unwrap();
    assert!(warning.starts_with("conversion failed"), "{warning}");
    assert!(warning.contains("timeout"), "{warning}");
}
