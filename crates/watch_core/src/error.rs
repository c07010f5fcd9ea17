use data_contracts::ValidationError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to prepare output dir {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write session manifest {path}: {source}")]
    SessionManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session: {0}")]
    InvalidSession(#[from] ValidationError),
    #[error("failed to open clip {path}: {source}")]
    OpenClip {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write frame {frame_id} to {path}: {source}")]
    WriteFrame {
        frame_id: u64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to finish clip {path}: {source}")]
    FinishClip {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type WatchResult<T> = Result<T, WatchError>;
