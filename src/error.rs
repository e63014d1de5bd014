//! Error types for viewpoint generation and dataset recording.
//!
//! Sample rejections and exhausted search budgets are not errors; they
//! surface as `AcceptanceSource` tags on the accepted viewpoint.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Rotation is neither a yaw-only quaternion nor a scalar yaw.
    #[error("Invalid orientation encoding: {0}")]
    InvalidOrientation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The simulator collaborator failed a query or step.
    #[error("Simulator error: {0}")]
    Simulator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
