use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file read failed: {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file write failed: {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("hardware detection failed: {0}")]
    Detection(String),

    #[error("{operation} failed: {detail}")]
    Collaborator { operation: String, detail: String },

    #[error("not running as root (required for {operation})")]
    NotRoot { operation: String },

    #[error(
        "conflicting writers for {}: {domain} claims it twice at equal priority",
        path.display()
    )]
    ConflictViolatesInvariant { path: PathBuf, domain: String },
}

impl Error {
    pub(crate) fn collaborator(operation: impl Into<String>, detail: impl ToString) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
