pub mod native;
pub mod types;

use crate::{config::RequestConfig, error::AdapterResult};
use std::path::Path;

pub use native::NativeEngine;
pub use types::{ChunkRequest, ConvertIn, ConvertOut, DocDiag, ProbeOut, SplitChunk};

pub trait Engine {
    fn doctor(&self) -> DocDiag;
    /// Never fails; problems are reported inside the result.
    fn probe_pdf(&self, input: &Path, sample_pages: u32) -> ProbeOut;
    fn split_pdf(&self, input: &Path, out_dir: &Path, ranges: &[ChunkRequest])
        -> AdapterResult<Vec<SplitChunk>>;
    fn convert_structured(&self, req: &ConvertIn, cfg: &RequestConfig) -> AdapterResult<ConvertOut>;
    fn convert_native_text(&self, req: &ConvertIn, cfg: &RequestConfig)
        -> AdapterResult<ConvertOut>;
}
