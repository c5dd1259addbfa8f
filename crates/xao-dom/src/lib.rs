//! xao-dom: response documents built as in-memory XML trees
//!
//! A [`DomDoc`] accumulates content from many sources (fresh elements,
//! files, strings, other documents) and records errors *inside* the tree it
//! is building, so whatever renders the document can render the errors too.
//!
//! # Quick Start
//!
//! ```rust
//! use xao_dom::DomDoc;
//!
//! let mut page = DomDoc::new("page");
//! page.append_to_root("title", "Hello")?;
//! page.consume_frag_data("<item>one</item><item>two</item>", "items", None)?;
//! page.consume_doc_data("<broken>", None)?;
//!
//! assert_eq!(page.elements_by_tag_name("item").len(), 2);
//! assert_eq!(page.exceptions()[0].code(), Some("DomDocInit"));
//! # Ok::<(), xao_dom::DomError>(())
//! ```

pub mod error;
pub mod exceptions;
pub mod factory;
pub mod names;
pub mod storage;
pub mod xpath;

mod document;
mod import;
mod tags;
mod tree;

// Re-export core types
pub use document::{DocMode, DomDoc, ErrorCallback};
pub use error::{DomError, Result};
pub use exceptions::{CallSite, Exception, DEFAULT_PREFIX, XAO_NAMESPACE};
pub use tags::TagCallback;
pub use xpath::XPath;

pub use xot::{Node, Xot};
