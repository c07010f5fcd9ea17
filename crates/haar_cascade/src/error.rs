use std::path::PathBuf;
use thiserror::Error;

pub type CascadeResult<T> = Result<T, CascadeError>;

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("xml parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("missing element <{0}>")]
    Missing(String),
    #[error("invalid number {value:?} in <{element}>")]
    Number { element: String, value: String },
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("malformed cascade: {0}")]
    Malformed(String),
    #[error("invalid detection parameters: {0}")]
    Params(String),
}
