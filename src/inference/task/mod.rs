use serde_json::{Map, Value};

pub mod fill_mask;
pub mod placeholder;

/// The JSON object returned for a request.
pub type Prediction = Map<String, Value>;
