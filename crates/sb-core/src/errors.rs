use std::path::PathBuf;

/// Core error type for the interaction core.
///
/// Adapter crates map their specific failures into `External` so the handler
/// can log and surface them consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid definition: {path}: {reason}")]
    Definition { path: PathBuf, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn definition(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Definition {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
