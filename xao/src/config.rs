//! Application settings.
//!
//! Every field has a default, so a TOML file only needs the settings it
//! changes:
//!
//! ```toml
//! debug = true
//! backend = "xsltproc"
//! xsltproc_path = "/usr/local/bin/xsltproc"
//! error_style = "skins/errors.xsl"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xao_dom::DEFAULT_PREFIX;
use xao_transform::{Backend, XsltProcessor, XsltprocEngine};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Honour request debug flags and keep error output verbose
    pub debug: bool,
    /// XSLT backend for server-side transformation
    pub backend: Backend,
    /// Prefix for XAO elements in the response document
    pub namespace_prefix: String,
    /// Content type sent regardless of the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_content_type: Option<String>,
    /// Leave transformation to the client via the stylesheet instruction
    pub client_side_transform: bool,
    /// Stylesheet that renders the document when a transformation fails
    /// outside debug mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_style: Option<PathBuf>,
    /// Location of the xsltproc program, searched on the path when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xsltproc_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            backend: Backend::default(),
            namespace_prefix: DEFAULT_PREFIX.to_string(),
            force_content_type: None,
            client_side_transform: false,
            error_style: None,
            xsltproc_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// A processor for the configured backend.
    pub fn processor(&self) -> XsltProcessor {
        match (self.backend, &self.xsltproc_path) {
            (Backend::Xsltproc, Some(program)) => {
                XsltProcessor::Xsltproc(XsltprocEngine::with_program(program))
            }
            (backend, _) => XsltProcessor::with_backend(backend),
        }
    }
}
