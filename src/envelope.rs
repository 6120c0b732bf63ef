//! One JSON request in on stdin, one JSON response out on stdout.
//!
//! Every failure, including a panic inside a decoding crate, is turned into
//! the adapter's structured failure response.

use crate::error::{AdapterError, AdapterResult};
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::io::{Read, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

pub trait Adapter {
    type Request: DeserializeOwned;
    type Response: Serialize;

    fn handle(&self, req: Self::Request) -> AdapterResult<Self::Response>;
    /// Structured response for a request that could not be served.
    fn reject(&self, err: &AdapterError) -> Self::Response;
}

/// Parses a request body; empty input counts as `{}`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> AdapterResult<T> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| AdapterError::InvalidRequest(e.to_string()))
}

/// Decodes a nested JSON value, treating `null` as the type's default.
pub fn decode_value<T: DeserializeOwned + Default>(value: serde_json::Value) -> AdapterResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| AdapterError::InvalidRequest(e.to_string()))
}

pub fn respond<A: Adapter>(adapter: &A, raw: &str) -> A::Response {
    let result = decode::<A::Request>(raw).and_then(|req| {
        catch_unwind(AssertUnwindSafe(|| adapter.handle(req)))
            .unwrap_or_else(|panic| Err(AdapterError::Conversion(panic_message(&*panic))))
    });
    match result {
        Ok(resp) => resp,
        Err(err) => {
            warn!("request failed: {err}");
            adapter.reject(&err)
        }
    }
}

pub fn serve<A: Adapter>(adapter: &A, mut input: impl Read, mut output: impl Write) -> Result<()> {
    let mut raw = String::new();
    let response = match input.read_to_string(&mut raw) {
        Ok(n) => {
            debug!("read {n} request bytes");
            respond(adapter, &raw)
        }
        Err(e) => adapter.reject(&AdapterError::InvalidRequest(format!("reading stdin: {e}"))),
    };
    let line = serde_json::to_string(&response).with_context(|| "serializing response")?;
    writeln!(output, "{line}").with_context(|| "writing response")?;
    output.flush().with_context(|| "flushing response")?;
    Ok(())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("backend panicked: {detail}")
}
