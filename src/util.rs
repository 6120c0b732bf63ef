use crate::error::{AdapterError, AdapterResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> AdapterResult<()> {
    std::fs::create_dir_all(p).map_err(|e| AdapterError::write(p, e))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Refuses inputs that are missing or larger than `max_bytes` (0 disables the size check).
pub fn check_input_size(path: &Path, max_bytes: u64) -> AdapterResult<u64> {
    let size = std::fs::metadata(path)
        .map_err(|e| AdapterError::source_read(path, e))?
        .len();
    if max_bytes > 0 && size > max_bytes {
        return Err(AdapterError::InvalidRequest(format!(
            "input exceeds max_input_file_bytes: {size} > {max_bytes}"
        )));
    }
    Ok(size)
}
