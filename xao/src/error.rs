//! Error types for the application wrapper

use std::path::PathBuf;

use xao_dom::DomError;
use xao_transform::TransformError;

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified error type for application operations
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Processing cannot continue. Carries the page to emit before stopping.
    #[error("{0}")]
    Fatal(String),

    /// A stylesheet checked for on disk does not exist
    #[error("the stylesheet {} does not exist", .0.display())]
    StylesheetNotFound(PathBuf),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Document error
    #[error(transparent)]
    Dom(#[from] DomError),

    /// Transformation error
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
