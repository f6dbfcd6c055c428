use anyhow::Result;
use clap::ValueEnum;
use clap_serde_derive::ClapSerde;
use serde::Deserialize;
use serde_json::Value;

use crate::bail_harness;
use crate::error::{ErrorKind, HarnessResult};

pub const DEFAULT_CONFIG_FILE: &str = "ModelHarness.toml";

/// Which predictor answers a request.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PredictMode {
    /// Always answers with the fixed placeholder mapping
    #[default]
    Placeholder,
    /// Fills the `[MASK]` token using the loaded model
    FillMask,
}

/// How the raw request text is turned into a payload.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    /// Pass the text through as a JSON string
    #[default]
    String,
    /// Parse the text as a JSON document
    Json,
}

impl InputType {
    /// Turns the raw request text into the payload handed to the predictor.
    pub fn payload(&self, raw: &str) -> HarnessResult<Value> {
        match self {
            InputType::String => Ok(Value::String(raw.to_string())),
            InputType::Json => match serde_json::from_str(raw) {
                Ok(payload) => Ok(payload),
                Err(err) => bail_harness!(
                    ErrorKind::MalformedInput,
                    "Input is not valid JSON: {}",
                    err
                ),
            },
        }
    }
}

#[derive(ClapSerde, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Hub repository id or local directory holding the masked language model
    #[default("bert-base-uncased".to_string())]
    #[arg(long, env = "HARNESS_CHECKPOINT")]
    pub checkpoint: String,

    /// Revision of the hub repository
    #[default("main".to_string())]
    #[arg(long, env = "HARNESS_REVISION")]
    pub revision: String,

    /// Number of candidates returned for the masked token
    #[default(5)]
    #[arg(short = 'k', long, env = "HARNESS_TOP_K")]
    pub top_k: usize,

    /// Predictor used for each request
    #[default(PredictMode::Placeholder)]
    #[arg(short, long, env = "HARNESS_MODE", value_enum)]
    pub mode: PredictMode,

    /// Interpretation of the raw request text
    #[default(InputType::String)]
    #[arg(long, env = "HARNESS_INPUT_TYPE", value_enum)]
    pub input_type: InputType,

    /// Log filter used when RUST_LOG is not set
    #[default("info".to_string())]
    #[arg(long, env = "HARNESS_LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let config = toml::from_str(&str)?;
        Ok(config)
    }
}
