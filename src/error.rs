//! Error types for the viewer.

use thiserror::Error;

/// Main error type for planetfolio.
#[derive(Error, Debug)]
pub enum Error {
    /// GPU adapter, device or surface errors
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Event loop creation or run errors
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse errors (content and config files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed content records
    #[error("Content error: {0}")]
    Content(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Model loading or geometry errors
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Font parsing errors
    #[error("Font error: {0}")]
    Font(String),

    /// Image decoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Scene graph structure errors (missing nodes, cycles)
    #[error("Scene graph error: {0}")]
    SceneGraph(String),
}

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
