//! xrust engine wrapper
//!
//! In-process XSLT 1.0. xrust binds top-level variables but not top-level
//! parameters, so every top-level `xsl:param` is rewritten into an
//! `xsl:variable` before compilation, carrying the caller's value when one
//! was given. `xsl:include`/`xsl:import` are resolved relative to the
//! stylesheet file when there is one; parameters declared in included
//! modules are not rewritten.

use std::path::Path;

use tracing::debug;
use url::Url;
use xao_dom::DomDoc;
use xrust::item::{Item as XrustItem, Node, SequenceTrait};
use xrust::parser::xml::parse as parse_xml;
use xrust::transform::context::StaticContextBuilder;
use xrust::trees::smite::RNode;
use xrust::xdmerror::{Error as XrustError, ErrorKind};
use xrust::xslt::from_document;

use crate::error::{Result, TransformError};
use crate::params::{self, XslParams};
use crate::traits::{Stylesheet, XsltEngine, XsltVersion};

/// xrust engine wrapper
#[derive(Debug, Default)]
pub struct XrustEngine;

impl XrustEngine {
    pub fn new() -> Self {
        Self
    }
}

fn parse(xml: &str) -> std::result::Result<RNode, XrustError> {
    let doc = RNode::new_document();
    parse_xml(doc.clone(), xml, None)?;
    Ok(doc)
}

fn fetch(url: &Url) -> std::result::Result<String, XrustError> {
    let path = url
        .to_file_path()
        .map_err(|()| XrustError::new(ErrorKind::NotImplemented, format!("cannot fetch {url}")))?;
    std::fs::read_to_string(&path).map_err(|e| {
        XrustError::new(
            ErrorKind::NotImplemented,
            format!("cannot read {}: {e}", path.display()),
        )
    })
}

fn base_url(path: Option<&Path>) -> Option<Url> {
    let path = std::fs::canonicalize(path?).ok()?;
    Url::from_file_path(path).ok()
}

/// Rewrite top-level parameters as variables in a copy of the stylesheet.
fn with_params(stylesheet: &str, params: &XslParams) -> Result<String> {
    let mut style = DomDoc::from_data(stylesheet);
    if let Some(failure) = style.exceptions().first() {
        return Err(TransformError::xslt(format!(
            "Failed to parse stylesheet: {}",
            failure.message
        )));
    }
    let applied = params::apply_to_stylesheet(&mut style, params)?;
    debug!(applied, "stylesheet parameters applied");
    Ok(style.xml_frag()?)
}

impl XsltEngine for XrustEngine {
    fn transform(
        &mut self,
        source: &str,
        stylesheet: Stylesheet<'_>,
        params: &XslParams,
    ) -> Result<String> {
        let style_text = with_params(stylesheet.text, params)?;

        // Parse the stylesheet and source
        let style = parse(&style_text)
            .map_err(|e| TransformError::xslt(format!("Failed to parse stylesheet: {e}")))?;
        let doc = parse(source)
            .map_err(|e| TransformError::xslt(format!("Failed to parse source: {e}")))?;

        // Compile stylesheet
        let mut context = from_document(style, base_url(stylesheet.path), parse, fetch)
            .map_err(|e| TransformError::xslt(e.to_string()))?;

        // Set source document as context
        context.context(vec![XrustItem::Node(doc)], 0);

        // Create result document
        let result_doc = RNode::new_document();
        context.result_document(result_doc.clone());

        let mut static_context = StaticContextBuilder::new()
            .message(|_| Ok(()))
            .fetcher(fetch)
            .parser(parse)
            .build();

        let sequence = context
            .evaluate(&mut static_context)
            .map_err(|e| TransformError::xslt(e.to_string()))?;

        // Text output leaves the result tree empty and the text in the sequence
        let output = result_doc.to_xml();
        if output.is_empty() {
            return Ok(sequence.to_string());
        }
        Ok(output)
    }

    fn xslt_version(&self) -> XsltVersion {
        XsltVersion::V1_0
    }

    fn name(&self) -> &'static str {
        "xrust"
    }
}
