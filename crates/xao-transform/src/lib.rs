//! xao-transform: XSLT transformation of XAO documents
//!
//! A [`Transformer`] takes a source document and a stylesheet, appends any
//! stylesheet parameters to the source so client-side stylesheets can see
//! them, and runs one of two backends selected at runtime:
//!
//! - **xrust**: in-process XSLT 1.0
//! - **xsltproc**: the libxslt command line processor
//!
//! # Quick Start
//!
//! ```rust
//! use xao_transform::{Backend, Transformer, XmlInput};
//!
//! let style = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"/>"#;
//! let mut transformer = Transformer::new(XmlInput::Data("<page/>"), XmlInput::Data(style));
//! transformer.set_backend(Backend::Xrust);
//! transformer.set_xsl_param("title", "Home")?;
//! assert!(transformer.error().is_none());
//! # Ok::<(), xao_transform::TransformError>(())
//! ```

pub mod cache;
pub mod engine_xrust;
pub mod engine_xsltproc;
pub mod error;
pub mod params;
pub mod traits;
pub mod transformer;
pub mod unified;

// Re-export core types
pub use cache::{CacheParams, MemoryCache, ResultCache};
pub use error::{Result, TransformError};
pub use params::{XslParams, XSLT_NAMESPACE};
pub use traits::{Stylesheet, XsltEngine, XsltVersion};
pub use transformer::{is_stylesheet, Transformer, XmlInput};
pub use unified::{Backend, XsltProcessor};

// Re-export engines
pub use engine_xrust::XrustEngine;
pub use engine_xsltproc::XsltprocEngine;
