pub mod adapters;
pub mod backend;
pub mod chunk_plan;
pub mod cli;
pub mod config;
pub mod convert;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod ocr;
pub mod options;
pub mod postprocess;
pub mod probe;
pub mod split;
pub mod util;
