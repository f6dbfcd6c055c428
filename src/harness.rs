//! The two entry points a serving host calls: [`load_model`] once at startup and
//! [`predict`] for every request.
//!
//! [`load_model`] returns a [`ModelHandle`] that bundles the tokenizer with the masked
//! language model, so everything needed for inference travels in one value. The handle is
//! immutable and cheap to clone, it can be shared read-only across threads.
//!
//! [`predict`] is still the unimplemented placeholder: it answers every request with
//! `{"result": "some output"}` whatever the payload or handle. Masked-token inference is
//! available through [`ModelHandle::fill_mask`] and is selected with [`PredictMode::FillMask`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Config, PredictMode};
use crate::error::{ErrorKind, HarnessError, HarnessResult};
use crate::inference::fill_mask_pipeline::FillMaskPipeline;
use crate::inference::models::model::ModelBase;
use crate::inference::source::{self, CheckpointSource, LocalCheckpoint};
use crate::inference::task::fill_mask::{FillMaskHandler, FillMaskRequest, FillMaskResponse};
use crate::inference::task::placeholder::placeholder_prediction;
use crate::inference::task::Prediction;

/// A loaded masked language model together with its tokenizer.
#[derive(Clone)]
pub struct ModelHandle {
    base: ModelBase,
    pipeline: Arc<FillMaskPipeline>,
    top_k: usize,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("base", &self.base)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl ModelHandle {
    pub fn new(base: ModelBase, source: &dyn CheckpointSource, top_k: usize) -> HarnessResult<Self> {
        let pipeline = FillMaskPipeline::with_safetensors(source)
            .map_err(|e| HarnessError::from(e).with_kind(ErrorKind::Load))?;
        Ok(ModelHandle {
            base,
            pipeline: Arc::new(pipeline),
            top_k,
        })
    }

    /// Loads a checkpoint laid out in `dir`, bypassing hub resolution.
    pub fn from_dir(dir: &std::path::Path, top_k: usize) -> HarnessResult<Self> {
        let base = ModelBase::masked_lm(&dir.to_string_lossy(), None);
        ModelHandle::new(base, &LocalCheckpoint::new(dir), top_k)
    }

    pub fn base(&self) -> &ModelBase {
        &self.base
    }

    /// Runs masked-token inference on a request payload.
    pub fn fill_mask(&self, inp: &Value) -> HarnessResult<Prediction> {
        let request = FillMaskRequest::from_payload(inp)?;
        let response = self.run_fill_mask(request)?;
        match serde_json::to_value(response)? {
            Value::Object(map) => Ok(map),
            other => Err(HarnessError::new(
                ErrorKind::Inference,
                format!("Response serialized to {other}, expected an object"),
            )),
        }
    }
}

impl FillMaskHandler for ModelHandle {
    fn run_fill_mask(&self, request: FillMaskRequest) -> HarnessResult<FillMaskResponse> {
        let top_k = request.top_k.unwrap_or(self.top_k);
        let (result, inference_time) = self.pipeline.fill(&request.input, top_k)?;
        Ok(FillMaskResponse {
            result,
            inference_time,
        })
    }
}

/// Loads the default checkpoint.
pub fn load_model() -> HarnessResult<ModelHandle> {
    load_model_with(&Config::default())
}

#[tracing::instrument(level = "info", skip(config), fields(checkpoint = %config.checkpoint))]
pub fn load_model_with(config: &Config) -> HarnessResult<ModelHandle> {
    let source = source::resolve(&config.checkpoint, &config.revision)
        .map_err(|e| HarnessError::from(e).with_kind(ErrorKind::Load))?;
    let revision = if std::path::Path::new(&config.checkpoint).is_dir() {
        None
    } else {
        Some(config.revision.as_str())
    };
    let base = ModelBase::masked_lm(&config.checkpoint, revision);

    let start = std::time::Instant::now();
    let handle = ModelHandle::new(base, source.as_ref(), config.top_k)?;
    info!(
        model = %handle.base.name,
        elapsed = start.elapsed().as_secs_f64(),
        "Model loaded"
    );
    Ok(handle)
}

/// Placeholder predictor: returns `{"result": "some output"}` for every payload and ignores
/// the handle.
pub fn predict(_inp: &Value, _model: Option<&ModelHandle>) -> Prediction {
    placeholder_prediction()
}

/// Answers a request with the predictor selected by `mode`, failures become an error mapping.
pub fn run(mode: PredictMode, inp: &Value, model: Option<&ModelHandle>) -> Prediction {
    match mode {
        PredictMode::Placeholder => predict(inp, model),
        PredictMode::FillMask => {
            let Some(model) = model else {
                return HarnessError::new(
                    ErrorKind::Load,
                    "Fill-mask needs a loaded model but none was supplied",
                )
                .into_prediction();
            };
            model.fill_mask(inp).unwrap_or_else(|err| {
                warn!(kind = %err.kind, "Prediction failed: {}", err.message());
                err.into_prediction()
            })
        }
    }
}
