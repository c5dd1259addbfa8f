//! Stylesheet parameters.
//!
//! Parameters reach the transformation two ways: as real top-level
//! parameters of the stylesheet, and as an `xslParams` element appended to
//! the source document so client-side stylesheets can read them too.

use xao_dom::{DomDoc, Node};

use crate::error::{Result, TransformError};

/// Namespace of XSLT instructions
pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

/// Ordered name/value parameter set. Names are safe names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XslParams {
    entries: Vec<(String, String)>,
}

impl XslParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any earlier value for `name`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        if !DomDoc::is_safe_name(name) {
            return Err(TransformError::InvalidParamName(name.to_string()));
        }
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append `<xao:xslParams>` with one `<xao:param name="..">` per parameter
/// under the root of `doc`, using the document's XAO prefix.
///
/// Returns `None` when there is nothing to append.
pub fn append_to_source(doc: &mut DomDoc, params: &XslParams) -> Result<Option<Node>> {
    if params.is_empty() {
        return Ok(None);
    }
    let prefix = doc.namespace_prefix().to_string();
    let container = doc.append_to_root(&format!("{prefix}:xslParams"), "")?;
    for (name, value) in params.iter() {
        let param = doc.append_to_node(container, &format!("{prefix}:param"), value)?;
        doc.set_attributes(param, &[("name", name)])?;
    }
    Ok(Some(container))
}

/// Turn the stylesheet's top-level `xsl:param` elements into `xsl:variable`
/// elements, for processors that only bind top-level variables.
///
/// A parameter named in `params` gets that value as its content and loses
/// its `select`; any other keeps its own default. Parameters the stylesheet
/// does not declare are ignored. Returns how many were overridden.
pub fn apply_to_stylesheet(style: &mut DomDoc, params: &XslParams) -> Result<usize> {
    let root = style.root();
    let variable = {
        let xot = style.xot_mut();
        let ns = xot.add_namespace(XSLT_NAMESPACE);
        xot.add_name_ns("variable", ns)
    };
    let mut applied = 0;
    for child in style.element_children(root) {
        let is_param = style.namespace_uri(child) == Some(XSLT_NAMESPACE)
            && style.local_name(child) == Some("param");
        if !is_param {
            continue;
        }
        if let Some(element) = style.xot_mut().element_mut(child) {
            element.set_name(variable);
        }
        let Some(name) = style.attribute(child, "name") else {
            continue;
        };
        if let Some(value) = params.get(&name) {
            style.set_content(child, value)?;
            style.remove_attribute(child, "select")?;
            applied += 1;
        }
    }
    Ok(applied)
}
