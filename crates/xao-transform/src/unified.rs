//! Unified processor wrapper with runtime backend selection
//!
//! Provides a single `XsltProcessor` type that can use either backend with
//! the same API, selectable at runtime.

use serde::{Deserialize, Serialize};

use crate::engine_xrust::XrustEngine;
use crate::engine_xsltproc::XsltprocEngine;
use crate::error::Result;
use crate::params::XslParams;
use crate::traits::{Stylesheet, XsltEngine, XsltVersion};

/// Backend engine selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// xrust - in-process XSLT ~1.0
    #[default]
    Xrust,
    /// xsltproc - the libxslt command line processor, XSLT 1.0
    Xsltproc,
}

/// Unified XSLT processor with runtime backend selection
#[derive(Debug)]
pub enum XsltProcessor {
    Xrust(XrustEngine),
    Xsltproc(XsltprocEngine),
}

impl Default for XsltProcessor {
    fn default() -> Self {
        Self::with_backend(Backend::default())
    }
}

impl XsltProcessor {
    /// Create a new processor with the xrust backend
    pub fn xrust() -> Self {
        Self::Xrust(XrustEngine::new())
    }

    /// Create a new processor running `xsltproc` from the search path
    pub fn xsltproc() -> Self {
        Self::Xsltproc(XsltprocEngine::new())
    }

    /// Create a new processor with the specified backend
    pub fn with_backend(backend: Backend) -> Self {
        match backend {
            Backend::Xrust => Self::xrust(),
            Backend::Xsltproc => Self::xsltproc(),
        }
    }

    /// Get the current backend
    pub fn backend(&self) -> Backend {
        match self {
            Self::Xrust(_) => Backend::Xrust,
            Self::Xsltproc(_) => Backend::Xsltproc,
        }
    }

    fn engine(&mut self) -> &mut dyn XsltEngine {
        match self {
            Self::Xrust(engine) => engine,
            Self::Xsltproc(engine) => engine,
        }
    }

    // ==================== XSLT ====================

    /// Transform a serialized document
    pub fn transform(
        &mut self,
        source: &str,
        stylesheet: Stylesheet<'_>,
        params: &XslParams,
    ) -> Result<String> {
        self.engine().transform(source, stylesheet, params)
    }

    /// Get the XSLT version supported by the current backend
    pub fn xslt_version(&self) -> XsltVersion {
        match self {
            Self::Xrust(engine) => engine.xslt_version(),
            Self::Xsltproc(engine) => engine.xslt_version(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Xrust(engine) => engine.name(),
            Self::Xsltproc(engine) => engine.name(),
        }
    }
}

impl From<Backend> for XsltProcessor {
    fn from(backend: Backend) -> Self {
        Self::with_backend(backend)
    }
}
