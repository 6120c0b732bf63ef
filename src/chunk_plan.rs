use crate::{
    engine::types::ChunkRequest,
    error::{AdapterError, AdapterResult},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start_page: u32, // 1-based inclusive
    pub end_page: u32,   // 1-based inclusive
}

impl PageRange {
    /// Checks `1 <= start <= end <= page_count`.
    pub fn validate(start: i64, end: i64, page_count: u32) -> AdapterResult<Self> {
        if start < 1 || end < start || end > i64::from(page_count) {
            return Err(AdapterError::InvalidRange {
                start,
                end,
                page_count,
            });
        }
        // Both bounds are within [1, page_count] here, so they fit in u32.
        Ok(Self {
            start_page: start as u32,
            end_page: end as u32,
        })
    }

    pub fn whole(page_count: u32) -> Self {
        Self {
            start_page: 1,
            end_page: page_count,
        }
    }

    pub fn len(&self) -> u32 {
        (self.end_page + 1).saturating_sub(self.start_page)
    }

    pub fn is_empty(&self) -> bool {
        self.end_page < self.start_page
    }

    pub fn contains(&self, page: u32) -> bool {
        (self.start_page..=self.end_page).contains(&page)
    }

    /// 1-based page numbers in order.
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.start_page..=self.end_page
    }
}

/// Validates every requested range against `page_count`, failing on the first bad one.
pub fn validate_all(requests: &[ChunkRequest], page_count: u32) -> AdapterResult<Vec<PageRange>> {
    requests
        .iter()
        .map(|r| PageRange::validate(r.start_page, r.end_page, page_count))
        .collect()
}

/// Fixed-width name so lexical order equals chunk order.
pub fn chunk_file_name(index: usize, range: &PageRange) -> String {
    format!(
        "chunk_{:05}_p{:05}-p{:05}.pdf",
        index, range.start_page, range.end_page
    )
}

pub fn chunk_path(out_dir: &Path, index: usize, range: &PageRange) -> PathBuf {
    out_dir.join(chunk_file_name(index, range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_and_out_of_bounds() {
        assert!(PageRange::validate(0, 1, 3).is_err());
        assert!(PageRange::validate(3, 2, 3).is_err());
        assert!(PageRange::validate(2, 5, 3).is_err());
        assert!(PageRange::validate(1, 1, 0).is_err());
        assert_eq!(PageRange::validate(2, 3, 3).unwrap().len(), 2);
    }

    #[test]
    fn names_are_zero_padded() {
        let r = PageRange {
            start_page: 6,
            end_page: 10,
        };
        assert_eq!(chunk_file_name(1, &r), "chunk_00001_p00006-p00010.pdf");
    }

    #[test]
    fn first_invalid_range_is_reported() {
        let reqs = [
            ChunkRequest {
                start_page: 1,
                end_page: 2,
            },
            ChunkRequest {
                start_page: 4,
                end_page: 9,
            },
            ChunkRequest {
                start_page: 0,
                end_page: 1,
            },
        ];
        let err = validate_all(&reqs, 5).unwrap_err();
        assert_eq!(err.to_string(), "invalid chunk range: 4-9 (pages=5)");
    }
}
