//! Core trait for XSLT backends
//!
//! A backend turns a serialized source document and a stylesheet into the
//! textual result of the transformation.

use std::path::Path;

use xao_dom::DomDoc;

use crate::error::Result;
use crate::params::XslParams;

/// Version of XSLT a backend implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XsltVersion {
    V1_0,
    V2_0,
    V3_0,
}

/// A stylesheet handed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct Stylesheet<'a> {
    /// Serialized stylesheet
    pub text: &'a str,
    /// File the stylesheet was read from, so relative imports can resolve
    pub path: Option<&'a Path>,
}

impl<'a> Stylesheet<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, path: None }
    }

    pub fn with_path(mut self, path: Option<&'a Path>) -> Self {
        self.path = path;
        self
    }
}

/// XSLT transformation capability
pub trait XsltEngine {
    /// Transform `source` (a serialized XML document) with `stylesheet`,
    /// passing `params` as top-level stylesheet parameters.
    fn transform(
        &mut self,
        source: &str,
        stylesheet: Stylesheet<'_>,
        params: &XslParams,
    ) -> Result<String>;

    /// Transform a document
    fn transform_doc(
        &mut self,
        source: &DomDoc,
        stylesheet: Stylesheet<'_>,
        params: &XslParams,
    ) -> Result<String> {
        let source = source.xml_doc()?;
        self.transform(&source, stylesheet, params)
    }

    /// Get the supported XSLT version
    fn xslt_version(&self) -> XsltVersion;

    /// Short name used in log output
    fn name(&self) -> &'static str;
}
