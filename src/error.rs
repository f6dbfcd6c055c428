use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::inference::task::Prediction;

/// Which side of the harness a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The checkpoint could not be resolved or materialized
    Load,
    /// The request payload cannot be used for inference
    MalformedInput,
    /// Tokenization or the forward pass failed
    Inference,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Load => write!(f, "load"),
            ErrorKind::MalformedInput => write!(f, "malformed_input"),
            ErrorKind::Inference => write!(f, "inference"),
        }
    }
}

// Shaped after https://github.com/tokio-rs/axum/blob/main/examples/anyhow-error-response/src/main.rs
#[derive(Debug)]
pub struct HarnessError {
    pub kind: ErrorKind,
    pub message: ErrorResponse,
}

#[derive(Debug)]
pub struct ErrorResponse {
    error: String,
}

impl From<String> for ErrorResponse {
    fn from(message: String) -> Self {
        ErrorResponse { error: message }
    }
}

impl From<&str> for ErrorResponse {
    fn from(message: &str) -> Self {
        ErrorResponse {
            error: message.to_string(),
        }
    }
}

impl HarnessError {
    pub fn new(kind: ErrorKind, message: impl Into<ErrorResponse>) -> Self {
        HarnessError {
            kind,
            message: message.into(),
        }
    }

    /// Re-tags an error, used where a whole stage has a single failure kind.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn message(&self) -> &str {
        &self.message.error
    }

    /// Renders the error as the structured mapping handed back instead of a prediction.
    pub fn into_prediction(self) -> Prediction {
        let mut map = Prediction::new();
        map.insert("error".into(), Value::String(self.message.error));
        map.insert("kind".into(), Value::String(self.kind.to_string()));
        map
    }
}

impl Display for HarnessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message.error)
    }
}

impl<E> From<E> for HarnessError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        HarnessError {
            kind: ErrorKind::Inference,
            message: ErrorResponse::from(format!("{:#}", err.into())),
        }
    }
}

pub type HarnessResult<T, E = HarnessError> = Result<T, E>;

#[macro_export]
macro_rules! bail_harness {
    ($error_message:expr) => {
        return Err($crate::error::HarnessError::new($crate::error::ErrorKind::Inference, $error_message))
    };
    ($kind:expr, $error_message:expr) => {
        return Err($crate::error::HarnessError::new($kind, $error_message))
    };
    ($kind:expr, $fmt:expr $(, $arg:expr)*) => {
        return Err($crate::error::HarnessError::new($kind, format!($fmt $(, $arg)*)))
    };
}
