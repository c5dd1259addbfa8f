//! Error types for document operations
//!
//! These are programmer errors: bad names, wrong node kinds, unreadable
//! targets. Problems with the *content* of a document (malformed input,
//! failed imports) are recorded inside the document instead, see
//! [`crate::exceptions`].

use std::path::PathBuf;

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DomError>;

/// Unified error type for document operations
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    /// XML parsing failed
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// A name is not a legal XML element name
    #[error("{0} is not a valid element name")]
    InvalidName(String),

    /// A namespace prefix has no declaration in scope
    #[error("prefix {0} is not bound to a namespace")]
    UnboundPrefix(String),

    /// A node handed to an operation is not an element
    #[error("{0}: node is not a valid element node")]
    NotAnElement(&'static str),

    /// XPath compilation failed
    #[error("XPath compilation error: {0}")]
    XPathCompile(String),

    /// XPath evaluation failed
    #[error("XPath evaluation error: {0}")]
    XPathEval(String),

    /// A target file does not exist
    #[error("{} was not found", .0.display())]
    FileNotFound(PathBuf),

    /// An advisory lock could not be obtained
    #[error("could not get a {kind} lock on {}: {source}", .path.display())]
    Lock {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tree manipulation failed inside xot
    #[error("tree error: {0}")]
    Tree(#[from] xot::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomError {
    /// Create a new XPath compilation error
    pub fn xpath_compile<S: Into<String>>(msg: S) -> Self {
        DomError::XPathCompile(msg.into())
    }

    /// Create a new XPath evaluation error
    pub fn xpath_eval<S: Into<String>>(msg: S) -> Self {
        DomError::XPathEval(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_mentions_path() {
        let err = DomError::FileNotFound(PathBuf::from("/no/such/file.xml"));
        assert!(err.to_string().contains("/no/such/file.xml"));
    }

    #[test]
    fn xpath_helpers_wrap_message() {
        let err = DomError::xpath_compile("unexpected token");
        assert_eq!(err.to_string(), "XPath compilation error: unexpected token");
    }
}
