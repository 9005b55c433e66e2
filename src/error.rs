use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PortError {
    #[error("invalid port name: {0:?}")]
    InvalidPortName(String),

    #[error("invalid port descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("failed to read port descriptor at {0}")]
    DescriptorRead(PathBuf),

    #[error("port {port} is unavailable: {message}")]
    BackendUnavailable { port: String, message: String },

    #[error("file index {index} out of range for {len} cached files")]
    FileIndexOutOfRange { index: usize, len: usize },

    #[error("port request failed: {0}")]
    Transport(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
