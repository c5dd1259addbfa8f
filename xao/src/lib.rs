//! xao: XML response documents for web applications
//!
//! Build the response as an XML tree, gather content and errors onto it from
//! files, strings and other documents, optionally transform it with XSLT on
//! the server, and send it with a content type that fits what is sent.
//!
//! # Quick Start
//!
//! ```rust
//! use xao::{AppConfig, AppDoc, DebugFlags};
//!
//! let mut page = AppDoc::new("page", AppConfig::default());
//! page.append_to_root("title", "Hello")?;
//! page.consume_doc_data("<news><item>First</item></news>", None)?;
//!
//! let response = page.send(&DebugFlags::from_query(""))?;
//! assert_eq!(response.content_type, "text/xml");
//! assert!(response.body.contains("<title>Hello</title>"));
//! # Ok::<(), xao::AppError>(())
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod request;
pub mod response;

// Re-export core types
pub use app::AppDoc;
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use request::DebugFlags;
pub use response::{sniff_content_type, Response};

// Re-export the document and transform layers
pub use xao_dom::{self, DocMode, DomDoc, DomError, Exception, Node, XPath, XAO_NAMESPACE};
pub use xao_transform::{
    self, Backend, CacheParams, MemoryCache, ResultCache, TransformError, Transformer, XmlInput,
    XsltProcessor,
};
