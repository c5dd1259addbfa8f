//! Grafting content from other documents.
//!
//! Every document owns its own arena, so content from elsewhere is copied
//! rather than moved: names, namespace declarations (including those the
//! fragment inherited from its old ancestors), attributes, text, comments
//! and processing instructions. The target position is reserved with a placeholder before the
//! copy is built and the copy is then swapped in for it.

use std::path::Path;

use tracing::debug;
use xot::{NameId, Node, Value, Xot};

use crate::document::DomDoc;
use crate::error::{DomError, Result};
use crate::names;
use crate::tree;

impl DomDoc {
    /// Copy `node` from `source` below `stub` and return the copy.
    pub fn import_child_frag(&mut self, stub: Node, source: &Xot, node: Node) -> Result<Node> {
        if !self.is_element(stub) {
            return Err(DomError::NotAnElement("import_child_frag: stub"));
        }
        if !tree::is_element(source, node) {
            return Err(DomError::NotAnElement("import_child_frag: fragment"));
        }

        let tmp = self.xot.add_name("tmp");
        let placeholder = self.xot.new_element(tmp);
        self.xot.append(stub, placeholder)?;

        let copy = match self.copy_element(source, node) {
            Ok(copy) => copy,
            Err(err) => {
                self.xot.remove(placeholder)?;
                return Err(err);
            }
        };
        self.declare_inherited(source, node, copy, stub);
        self.xot.insert_before(placeholder, copy)?;
        self.xot.remove(placeholder)?;

        debug!("fragment imported");
        Ok(copy)
    }

    /// Graft the root of another document below `stub` (the root when
    /// `None`). Exceptions recorded on `source` are carried over.
    pub fn consume_doc(&mut self, source: &DomDoc, stub: Option<Node>) -> Result<Node> {
        let stub = stub.unwrap_or(self.root());
        let node = self.import_child_frag(stub, source.xot(), source.root())?;
        self.records.extend(source.exceptions().iter().cloned());
        Ok(node)
    }

    /// Parse a file and graft its root below `stub`. A file that cannot be
    /// read or parsed arrives as a placeholder carrying the error.
    #[track_caller]
    pub fn consume_file(&mut self, path: impl AsRef<Path>, stub: Option<Node>) -> Result<Node> {
        let source = DomDoc::from_file(path);
        self.consume_doc(&source, stub)
    }

    /// Wrap well-balanced data in `<root_name>` and graft the result.
    #[track_caller]
    pub fn consume_frag_data(
        &mut self,
        data: &str,
        root_name: &str,
        stub: Option<Node>,
    ) -> Result<Node> {
        if !names::is_valid_name(root_name) {
            return Err(DomError::InvalidName(root_name.to_string()));
        }
        let wrapped = format!("<?xml version=\"1.0\"?>\n<{root_name}>{data}</{root_name}>");
        let source = DomDoc::from_data(&wrapped);
        self.consume_doc(&source, stub)
    }

    /// Parse a complete document held in a string and graft its root.
    #[track_caller]
    pub fn consume_doc_data(&mut self, data: &str, stub: Option<Node>) -> Result<Node> {
        let source = DomDoc::from_data(data);
        self.consume_doc(&source, stub)
    }

    fn copy_element(&mut self, source: &Xot, node: Node) -> Result<Node> {
        let name = self.foreign_name(source, tree::element_name(source, node))?;
        let element = self.xot.new_element(name);

        for (prefix, ns) in tree::declarations(source, node) {
            let prefix = self.xot.add_prefix(source.prefix_str(prefix));
            let ns = self.xot.add_namespace(source.namespace_str(ns));
            self.xot.namespaces_mut(element).insert(prefix, ns);
        }
        for (attribute, value) in tree::attributes(source, node) {
            let attribute = self.foreign_name(source, Some(attribute))?;
            self.xot.attributes_mut(element).insert(attribute, value);
        }

        for child in tree::children(source, node) {
            let copy = match source.value(child) {
                Value::Element(_) => self.copy_element(source, child)?,
                Value::Text(text) => self.xot.new_text(text.get()),
                Value::Comment(comment) => self.xot.new_comment(comment.get()),
                Value::ProcessingInstruction(pi) => {
                    let target = self.xot.add_name(source.local_name_str(pi.target()));
                    self.xot.new_processing_instruction(target, pi.data())
                }
                _ => continue,
            };
            self.xot.append(element, copy)?;
        }
        Ok(element)
    }

    /// Intern a name from another arena in this one.
    fn foreign_name(&mut self, source: &Xot, name: Option<NameId>) -> Result<NameId> {
        let name = name.ok_or(DomError::NotAnElement("import_child_frag"))?;
        let local = tree::local_name(source, name);
        Ok(match tree::namespace_uri(source, name) {
            Some(uri) => {
                let ns = self.xot.add_namespace(uri);
                self.xot.add_name_ns(local, ns)
            }
            None => self.xot.add_name(local),
        })
    }

    /// Re-declare, on the copy, prefixes the fragment inherited from its old
    /// ancestors that are not already bound the same way at `stub`.
    fn declare_inherited(&mut self, source: &Xot, node: Node, copy: Node, stub: Node) {
        let inherited = tree::ancestors_or_self(source, node)
            .skip(1)
            .flat_map(|ancestor| tree::declarations(source, ancestor));
        for (prefix, ns) in inherited {
            let prefix_text = source.prefix_str(prefix);
            let uri = source.namespace_str(ns);

            let declared_on_copy = tree::declarations(&self.xot, copy)
                .iter()
                .any(|(p, _)| self.xot.prefix_str(*p) == prefix_text);
            let bound_at_stub = tree::resolve_prefix(&self.xot, stub, prefix_text)
                .is_some_and(|bound| self.xot.namespace_str(bound) == uri);
            if declared_on_copy || bound_at_stub {
                continue;
            }

            let prefix = self.xot.add_prefix(prefix_text);
            let ns = self.xot.add_namespace(uri);
            self.xot.namespaces_mut(copy).insert(prefix, ns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inherited_prefix_is_redeclared() {
        let source = DomDoc::from_data(r#"<outer xmlns:p="urn:p"><p:inner a="1"/></outer>"#);
        let inner = source.element_children(source.root())[0];

        let mut host = DomDoc::new("host");
        let root = host.root();
        let copy = host.import_child_frag(root, source.xot(), inner).unwrap();

        assert_eq!(host.namespace_uri(copy), Some("urn:p"));
        assert_eq!(
            host.xml_frag().unwrap(),
            r#"<host><p:inner xmlns:p="urn:p" a="1"/></host>"#
        );
    }

    #[test]
    fn placeholder_does_not_survive() {
        let source = DomDoc::from_data("<a><b/></a>");
        let mut host = DomDoc::from_data("<host><first/></host>");
        let root = host.root();
        host.import_child_frag(root, source.xot(), source.root()).unwrap();
        assert!(host.elements_by_tag_name("tmp").is_empty());
        assert_eq!(host.xml_frag().unwrap(), "<host><first/><a><b/></a></host>");
    }

    #[test]
    fn processing_instructions_are_copied() {
        let mut host = DomDoc::new("host");
        host.consume_doc_data("<a><?keep me?><b/></a>", None).unwrap();
        assert_eq!(
            host.xml_frag().unwrap(),
            "<host><a><?keep me?><b/></a></host>"
        );
    }

    #[test]
    fn non_element_stub_is_rejected() {
        let source = DomDoc::from_data("<a/>");
        let mut host = DomDoc::new("host");
        let document = host.document();
        let err = host
            .import_child_frag(document, source.xot(), source.root())
            .unwrap_err();
        assert!(matches!(err, DomError::NotAnElement(_)));
    }
}
