use crate::config::NativeText;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static HYPHEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)-\n(\w)").expect("static regex"));
static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\x0C\r ]+").expect("static regex"));

/// Applies the enabled native-text normalizations in a fixed order:
/// NFKC, hyphenation repair, whitespace collapse.
pub fn normalize_text(text: &str, cfg: &NativeText) -> String {
    let mut s = if cfg.normalize_unicode {
        text.nfkc().collect::<String>()
    } else {
        text.to_string()
    };

    if cfg.fix_hyphenation {
        s = HYPHEN_RE.replace_all(&s, "$1$2").into_owned();
    }

    if cfg.collapse_whitespace {
        s = s
            .lines()
            .map(|l| SPACE_RE.replace_all(l, " ").trim().to_string())
            .collect::<Vec<_>>()
            .join("\n");
    }

    s
}

/// Markdown body for a run of pages: blank-line separated, optionally headed.
pub fn join_pages(pages: &[(u32, String)], light_markdown: bool) -> String {
    pages
        .iter()
        .map(|(page, text)| {
            if light_markdown {
                format!("## Page {page}\n\n{text}")
            } else {
                text.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn count_garbage(text: &str) -> usize {
    text.chars().filter(|&c| c == char::REPLACEMENT_CHARACTER).count()
}
