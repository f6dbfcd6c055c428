use serde_json::Value;

use crate::inference::task::Prediction;

pub const PLACEHOLDER_OUTPUT: &str = "some output";

/// The fixed answer of the unimplemented predictor.
pub fn placeholder_prediction() -> Prediction {
    let mut map = Prediction::new();
    map.insert("result".into(), Value::String(PLACEHOLDER_OUTPUT.into()));
    map
}
