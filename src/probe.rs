use crate::{
    backend::{PdfBackend, TextSource},
    engine::types::ProbeOut,
    postprocess::count_garbage,
};
use std::path::Path;
use tracing::{debug, warn};

/// Evenly spaced, endpoint-inclusive 0-based page indices.
///
/// `k = min(requested, page_count)`; index `i` is `round(i * (n-1) / (k-1))`
/// with ties rounded to even, computed exactly in integers.
pub fn sample_indices(page_count: u32, requested: u32) -> Vec<u32> {
    let k = requested.min(page_count);
    match k {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            let span = u64::from(page_count - 1);
            let den = u64::from(k - 1);
            (0..u64::from(k))
                .map(|i| round_half_even(i * span, den) as u32)
                .collect()
        }
    }
}

fn round_half_even(num: u64, den: u64) -> u64 {
    let q = num / den;
    let r = num % den;
    match (2 * r).cmp(&den) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q & 1),
    }
}

/// Unicode whitespace plus the ASCII information separators U+001C..=U+001F.
pub fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    pub chars: u64,
    pub whitespace: u64,
    pub garbage: u64,
}

impl TextStats {
    pub fn add(&mut self, text: &str) {
        self.chars += text.chars().count() as u64;
        self.whitespace += text.chars().filter(|&c| is_space(c)).count() as u64;
        self.garbage += count_garbage(text) as u64;
    }

    pub fn summarize(&self, page_count: u32, sampled: u32) -> ProbeOut {
        let denom = self.chars.max(1) as f64;
        ProbeOut {
            page_count,
            sampled_pages: sampled,
            avg_chars_per_page: (self.chars / u64::from(sampled.max(1))) as u32,
            garbage_ratio: (self.garbage as f64 / denom) as f32,
            whitespace_ratio: (self.whitespace as f64 / denom) as f32,
            error: None,
        }
    }
}

/// Samples an opened document. Pages whose text cannot be extracted count as empty.
pub fn probe_source(source: &dyn TextSource, sample_pages: u32) -> ProbeOut {
    let page_count = source.page_count();
    if page_count == 0 {
        return ProbeOut::empty(None);
    }

    let idxs = sample_indices(page_count, sample_pages);
    debug!(page_count, ?idxs, "probe sample");

    let mut stats = TextStats::default();
    for &i in &idxs {
        match source.page_text(i + 1) {
            Ok(text) => stats.add(&text),
            Err(err) => warn!("probe: {err}"),
        }
    }
    stats.summarize(page_count, idxs.len() as u32)
}

/// Opens and samples `input`. Never fails; open errors are reported in the result.
pub fn probe_pdf(backend: PdfBackend, input: &Path, sample_pages: u32) -> ProbeOut {
    match backend.open(input) {
        Ok(source) => probe_source(source.as_ref(), sample_pages),
        Err(err) => {
            warn!("probe could not open {}: {err}", input.display());
            ProbeOut::empty(Some(err.to_string()))
        }
    }
}
