use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl CoreError {
    /// Stable code handed to the host with a failed command.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Playback(err) => err.code(),
            CoreError::Runtime(core_runtime::Error::Config(_)) => "INVALID_PARAMS",
            CoreError::Runtime(_) | CoreError::InitializationFailed(_) => "INIT_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
