//! CLI error types.

use std::path::PathBuf;

use mathmark_core::{ConfigError, RegistrationError};

#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("failed to load options from {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("failed to read {input}: {source}")]
    Read {
        input: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Registration(#[from] RegistrationError),

    #[error("failed to serialize tokens: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),
}
