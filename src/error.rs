use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfgenError {
    #[error("wrong header in {}: definition must start with `{}`", path.display(), crate::constants::DEFINITION_HEADER)]
    HeaderMismatch { path: PathBuf },

    #[error("schema error in {}: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid base config {}: {source}", path.display())]
    BaseConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfgenError {
    pub fn validation(message: impl Into<String>) -> Self {
        ConfgenError::Validation(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfgenError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors scoped to a single definition file; the run skips the file and continues.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            ConfgenError::HeaderMismatch { .. }
                | ConfgenError::Schema { .. }
                | ConfgenError::Validation(_)
        )
    }

    /// Short label used for counters and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ConfgenError::HeaderMismatch { .. } => "header",
            ConfgenError::Schema { .. } => "schema",
            ConfgenError::Validation(_) => "validation",
            ConfgenError::Io { .. } => "io",
            ConfgenError::BaseConfig { .. } => "base_config",
            ConfgenError::Yaml(_) | ConfgenError::Json(_) | ConfgenError::Toml(_) => "serialization",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfgenError>;
