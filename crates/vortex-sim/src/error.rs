#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;
use vortex_runtime::{ConfigError, VortexError};

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("config file not found: {path}")]
    MissingPath { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Vortex(#[from] VortexError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::MissingPath { .. } => 3,
            Self::Config(_) => 4,
            Self::Vortex(_) => 5,
            Self::Io(_) => 10,
            Self::Json(_) => 11,
        }
    }
}
