//! Error types for ONNX import.

use onnxt_core::CoreError;
use thiserror::Error;

/// Result type for ONNX import operations.
pub type Result<T> = std::result::Result<T, OnnxError>;

/// Errors that can occur while reading, converting or writing a model.
#[derive(Error, Debug)]
pub enum OnnxError {
    /// The model structure is malformed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// An ONNX datatype has no counterpart.
    #[error("type conversion error: {0}")]
    TypeConversionError(String),

    /// The model was produced for an IR version that is too old.
    #[error("unsupported ONNX IR version {version} (minimum {min_version})")]
    UnsupportedIrVersion {
        /// IR version declared by the model.
        version: i64,
        /// Oldest accepted IR version.
        min_version: i64,
    },

    /// A node attribute is malformed.
    #[error("invalid attribute '{name}': {reason}")]
    InvalidAttribute {
        /// Attribute name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// External tensor data could not be resolved.
    #[error("external data error: {0}")]
    ExternalData(String),

    /// No initializer carries this name.
    #[error("unknown initializer '{0}'")]
    UnknownInitializer(String),

    /// Import configuration could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Failure in a core weight operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Protobuf decoding failed.
    #[error("failed to decode ONNX protobuf: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Protobuf encoding failed.
    #[error("failed to encode ONNX protobuf: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
