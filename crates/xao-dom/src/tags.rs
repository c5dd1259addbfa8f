//! Callback processing of custom tags.
//!
//! Elements can be nominated for processing by tag name or by path query.
//! [`DomDoc::process_custom_tags`] then hands every matching node to its
//! callback, which is free to rewrite the document around it.

use std::fmt;

use tracing::debug;
use xot::Node;

use crate::document::DomDoc;
use crate::error::{DomError, Result};
use crate::names;
use crate::tree;
use crate::xpath::XPath;

/// Callback run for each node nominated by a custom tag rule.
pub type TagCallback = Box<dyn FnMut(&mut DomDoc, Node) -> Result<()>>;

#[derive(Default)]
pub(crate) struct CustomTags {
    by_name: Vec<(String, TagCallback)>,
    by_query: Vec<(XPath, TagCallback)>,
}

impl fmt::Debug for CustomTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTags")
            .field("names", &self.by_name.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field(
                "queries",
                &self.by_query.iter().map(|(q, _)| q.source()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CustomTags {
    fn run(&mut self, doc: &mut DomDoc) -> Result<usize> {
        let mut calls = 0;
        for (name, callback) in &mut self.by_name {
            for node in doc.elements_by_tag_name(name) {
                calls += invoke(doc, node, callback)?;
            }
        }
        for (query, callback) in &mut self.by_query {
            for node in doc.select(query)? {
                calls += invoke(doc, node, callback)?;
            }
        }
        Ok(calls)
    }

    /// Append rules registered while `self` was taken out for processing.
    fn merge(&mut self, other: CustomTags) {
        self.by_name.extend(other.by_name);
        self.by_query.extend(other.by_query);
    }
}

/// Run one callback unless an earlier callback detached the node.
fn invoke(doc: &mut DomDoc, node: Node, callback: &mut TagCallback) -> Result<usize> {
    let attached = tree::ancestors_or_self(&doc.xot, node).last() == Some(doc.document());
    if !attached {
        return Ok(0);
    }
    callback(doc, node)?;
    Ok(1)
}

impl DomDoc {
    /// Nominate elements named `name` for processing by `callback`.
    ///
    /// Registering the same name again replaces the earlier callback.
    pub fn set_custom_tag_name<F>(&mut self, name: &str, callback: F) -> Result<()>
    where
        F: FnMut(&mut DomDoc, Node) -> Result<()> + 'static,
    {
        if name != "*" && !names::is_valid_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        let callback: TagCallback = Box::new(callback);
        let rules = &mut self.custom_tags.by_name;
        match rules.iter_mut().find(|(existing, _)| existing == name) {
            Some(rule) => rule.1 = callback,
            None => rules.push((name.to_string(), callback)),
        }
        Ok(())
    }

    /// Nominate the nodes selected by `query` for processing by `callback`.
    /// The query is compiled here, so a malformed one fails immediately.
    pub fn set_custom_tag_query<F>(&mut self, query: &str, callback: F) -> Result<()>
    where
        F: FnMut(&mut DomDoc, Node) -> Result<()> + 'static,
    {
        let query = XPath::compile(query)?;
        self.custom_tags.by_query.push((query, Box::new(callback)));
        Ok(())
    }

    /// Run every name rule, then every query rule, over the matching nodes
    /// in document order. Returns the number of callback invocations.
    pub fn process_custom_tags(&mut self) -> Result<usize> {
        let mut rules = std::mem::take(&mut self.custom_tags);
        let outcome = rules.run(self);
        let added = std::mem::replace(&mut self.custom_tags, rules);
        self.custom_tags.merge(added);
        if let Ok(calls) = outcome {
            debug!(calls, "custom tags processed");
        }
        outcome
    }
}
