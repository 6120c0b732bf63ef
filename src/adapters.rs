use crate::{
    config::RequestConfig,
    engine::{
        Engine,
        types::{CommandPayload, ConvertIn, ConvertOut, DocDiag, ProbeIn, ProbeOut, SplitIn, SplitOut},
    },
    envelope::{Adapter, decode_value},
    error::{AdapterError, AdapterResult},
};
use serde::Serialize;
use std::path::Path;

/// Response shapes of the `runner` adapter.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunnerResponse {
    Doctor(DocDiag),
    Convert(ConvertOut),
    Rejected { ok: bool, error: String },
}

impl RunnerResponse {
    fn rejected(error: impl Into<String>) -> Self {
        Self::Rejected {
            ok: false,
            error: error.into(),
        }
    }
}

fn unknown_cmd(cmd: Option<&str>) -> String {
    format!("unknown cmd: {}", cmd.unwrap_or("null"))
}

fn convert_args(payload: CommandPayload) -> AdapterResult<(ConvertIn, RequestConfig)> {
    if payload.req.is_null() {
        return Err(AdapterError::InvalidRequest("missing req".to_string()));
    }
    let req: ConvertIn = serde_json::from_value(payload.req)
        .map_err(|e| AdapterError::InvalidRequest(format!("req: {e}")))?;
    let cfg: RequestConfig = decode_value(payload.cfg)?;
    Ok((req, cfg))
}

/// `doctor` and structured `convert`.
pub struct Runner<E: Engine> {
    engine: E,
}

impl<E: Engine> Runner<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: Engine> Adapter for Runner<E> {
    type Request = CommandPayload;
    type Response = RunnerResponse;

    fn handle(&self, payload: CommandPayload) -> AdapterResult<RunnerResponse> {
        let cmd = payload.cmd.clone();
        match cmd.as_deref() {
            Some("doctor") => Ok(RunnerResponse::Doctor(self.engine.doctor())),
            Some("convert") => {
                let out = convert_args(payload)
                    .and_then(|(req, cfg)| self.engine.convert_structured(&req, &cfg))
                    .unwrap_or_else(|err| ConvertOut::failed(err.to_string()));
                Ok(RunnerResponse::Convert(out))
            }
            other => Ok(RunnerResponse::rejected(unknown_cmd(other))),
        }
    }

    fn reject(&self, err: &AdapterError) -> RunnerResponse {
        RunnerResponse::rejected(err.to_string())
    }
}

/// Native text-layer `convert`.
pub struct TextConverter<E: Engine> {
    engine: E,
}

impl<E: Engine> TextConverter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: Engine> Adapter for TextConverter<E> {
    type Request = CommandPayload;
    type Response = ConvertOut;

    fn handle(&self, payload: CommandPayload) -> AdapterResult<ConvertOut> {
        if payload.cmd.as_deref() != Some("convert") {
            return Ok(ConvertOut::failed(unknown_cmd(payload.cmd.as_deref())));
        }
        let (req, cfg) = convert_args(payload)?;
        self.engine.convert_native_text(&req, &cfg)
    }

    fn reject(&self, err: &AdapterError) -> ConvertOut {
        ConvertOut::failed(err.to_string())
    }
}

/// Page-range partitioner.
pub struct Splitter<E: Engine> {
    engine: E,
}

impl<E: Engine> Splitter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: Engine> Adapter for Splitter<E> {
    type Request = SplitIn;
    type Response = SplitOut;

    fn handle(&self, req: SplitIn) -> AdapterResult<SplitOut> {
        let outputs = self.engine.split_pdf(
            Path::new(&req.input_pdf),
            Path::new(&req.out_dir),
            &req.chunks,
        )?;
        Ok(SplitOut {
            ok: true,
            outputs,
            error: None,
        })
    }

    fn reject(&self, err: &AdapterError) -> SplitOut {
        SplitOut::failed(err.to_string())
    }
}

/// Text sampling probe.
pub struct Prober<E: Engine> {
    engine: E,
    default_sample_pages: u32,
}

impl<E: Engine> Prober<E> {
    pub fn new(engine: E, default_sample_pages: u32) -> Self {
        Self {
            engine,
            default_sample_pages,
        }
    }
}

impl<E: Engine> Adapter for Prober<E> {
    type Request = ProbeIn;
    type Response = ProbeOut;

    fn handle(&self, req: ProbeIn) -> AdapterResult<ProbeOut> {
        let sample_pages = req.sample_pages.unwrap_or(self.default_sample_pages);
        Ok(self.engine.probe_pdf(Path::new(&req.input_pdf), sample_pages))
    }

    fn reject(&self, err: &AdapterError) -> ProbeOut {
        ProbeOut::empty(Some(err.to_string()))
    }
}
