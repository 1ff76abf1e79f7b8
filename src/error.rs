use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelcutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} failed with exit code {code:?}: {stderr}")]
    ExternalTool {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Malformed inspector output: {0}")]
    MalformedOutput(String),

    #[error("Invalid edit request: {0}")]
    InvalidEditRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl ReelcutError {
    /// Failure to launch or a non-zero exit from ffmpeg/ffprobe
    pub fn is_external_tool_failure(&self) -> bool {
        matches!(self, ReelcutError::ExternalTool { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReelcutError>;
