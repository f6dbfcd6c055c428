use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bail_harness;
use crate::error::{ErrorKind, HarnessResult};
use crate::inference::fill_mask_pipeline::MaskPrediction;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FillMaskRequest {
    pub input: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct FillMaskResponse {
    pub result: Vec<MaskPrediction>,
    pub inference_time: f64,
}

pub trait FillMaskHandler {
    fn run_fill_mask(&self, request: FillMaskRequest) -> HarnessResult<FillMaskResponse>;
}

impl FillMaskRequest {
    /// Accepts a bare string or an object with an `input` field.
    pub fn from_payload(payload: &Value) -> HarnessResult<Self> {
        match payload {
            Value::String(input) => Ok(FillMaskRequest {
                input: input.clone(),
                top_k: None,
            }),
            Value::Object(_) => match FillMaskRequest::deserialize(payload) {
                Ok(request) => Ok(request),
                Err(err) => bail_harness!(ErrorKind::MalformedInput, "Invalid request: {}", err),
            },
            other => bail_harness!(
                ErrorKind::MalformedInput,
                "Expected a string or an object with an `input` field, got {}",
                json_type(other)
            ),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
