use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ffprobe failed for {input}: {message}")]
    Probe { input: String, message: String },
    #[error("no video stream in {0}")]
    NoVideoStream(String),
    #[error("no camera found on indices 0..={max_index}")]
    NoCamera { max_index: u32 },
    #[error("frame size {got:?} does not match clip size {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
    #[error("ffmpeg exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

impl From<CaptureError> for std::io::Error {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Io(e) => e,
            other => std::io::Error::other(other.to_string()),
        }
    }
}
