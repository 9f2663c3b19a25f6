use onnxt_onnx::OnnxError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that end the run, each with its own exit code
#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid model bit depth {0} (expected 32 or 16)")]
    InvalidBitDepth(u32),

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to parse ONNX model {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: OnnxError,
    },

    #[error("failed to load config {}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: OnnxError,
    },

    #[error("failed to transpose initializer {name}")]
    Transpose {
        name: String,
        #[source]
        source: OnnxError,
    },

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: OnnxError,
    },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidBitDepth(_) => 2,
            Self::InputNotFound(_) | Self::Parse { .. } => 3,
            Self::Config { .. } => 4,
            Self::Transpose { .. } => 5,
            Self::Write { .. } => 6,
        }
    }
}
