//! Error types for the transform wrapper

use std::path::PathBuf;

use xao_dom::DomError;

/// Result type for transform operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// Unified error type for transform operations
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The source or stylesheet could not be loaded
    #[error("{0}")]
    Construction(String),

    /// The stylesheet document is XML but not XSLT
    #[error("{0} is an XML document but it is not a valid stylesheet")]
    NotAStylesheet(String),

    /// Parameter names must be safe names
    #[error(
        "{0} is not a valid XSL parameter name: multiline names, names beginning with \
         numbers and non alpha-numeric characters are not allowed, an underscore is allowed"
    )]
    InvalidParamName(String),

    /// XSLT transformation failed inside a backend
    #[error("XSLT transformation error: {0}")]
    Xslt(String),

    /// The external processor could not be started
    #[error("could not run XSLT processor {}: {source}", .program.display())]
    ProcessorUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document error
    #[error(transparent)]
    Dom(#[from] DomError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Create a new transformation error
    pub fn xslt<S: Into<String>>(msg: S) -> Self {
        TransformError::Xslt(msg.into())
    }
}
