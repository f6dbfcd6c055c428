pub mod config;
pub mod error;
pub mod harness;
pub mod inference;
pub mod telemetry;

pub use config::{Config, InputType, PredictMode};
pub use error::{ErrorKind, HarnessError, HarnessResult};
pub use harness::{load_model, load_model_with, predict, run, ModelHandle};
pub use inference::task::Prediction;
