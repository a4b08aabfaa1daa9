use thiserror::Error;

#[derive(Error, Debug)]
pub enum PerfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("performance engine not initialized")]
    NotInitialized,

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Clone for PerfError {
    fn clone(&self) -> Self {
        match self {
            PerfError::Io(e) => PerfError::Serialization(e.to_string()),
            PerfError::ConfigError(s) => PerfError::ConfigError(s.clone()),
            PerfError::OutOfMemory(s) => PerfError::OutOfMemory(s.clone()),
            PerfError::NotInitialized => PerfError::NotInitialized,
            PerfError::InvalidArg(s) => PerfError::InvalidArg(s.clone()),
            PerfError::Serialization(s) => PerfError::Serialization(s.clone()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PerfError>;
