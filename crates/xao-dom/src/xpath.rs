//! Path queries over a document, evaluated by xrust.
//!
//! xrust evaluates over its own tree type, so a query runs against a mirror
//! of the document's element, text, comment and processing-instruction
//! nodes. The mirror remembers which xot node each of its nodes stands for,
//! and selected nodes are handed back as xot nodes in document order.
//!
//! Name tests follow XPath: an unprefixed name matches elements in no
//! namespace, and a prefix resolves through the declarations made anywhere
//! in the document, plus the document's XAO prefix.

use std::collections::HashMap;
use std::rc::Rc;

use xot::{NameId, Node, Value, Xot};
use xrust::item::{Item, Node as _, NodeType, Sequence, SequenceTrait};
use xrust::parser::xpath::parse as parse_xpath;
use xrust::qname::QualifiedName;
use xrust::transform::context::{ContextBuilder, StaticContextBuilder};
use xrust::transform::Transform;
use xrust::trees::smite::RNode;
use xrust::value::Value as XrustValue;
use xrust::xdmerror::{Error as XrustError, ErrorKind};

use crate::error::{DomError, Result};
use crate::tree;

/// A compiled path query.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
}

impl XPath {
    /// Compile a query.
    ///
    /// # Examples
    /// ```
    /// use xao_dom::XPath;
    ///
    /// assert!(XPath::compile("//item[@id='a']").is_ok());
    /// assert!(XPath::compile("//item[").is_err());
    /// ```
    pub fn compile(source: &str) -> Result<Self> {
        parse_xpath::<RNode>(source, None)
            .map_err(|e| DomError::xpath_compile(format!("{source}: {e}")))?;
        Ok(Self {
            source: source.to_string(),
        })
    }

    /// The query text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate from the document node and return the selected tree nodes in
    /// document order.
    pub(crate) fn select_nodes(
        &self,
        xot: &Xot,
        document: Node,
        bindings: &[(String, String)],
    ) -> Result<Vec<Node>> {
        let (mirror, sequence) = self.evaluate(xot, document, bindings)?;

        let mut positions = Vec::with_capacity(sequence.len());
        for item in &sequence {
            let Item::Node(node) = item else {
                return Err(DomError::xpath_eval(format!(
                    "{} does not select nodes",
                    self.source
                )));
            };
            match mirror.position(node) {
                Some(position) => positions.push(position),
                None if node.node_type() == NodeType::Attribute => {
                    return Err(DomError::xpath_eval(format!(
                        "{} selects attribute nodes, which cannot be returned as tree nodes",
                        self.source
                    )))
                }
                None => {
                    return Err(DomError::xpath_eval(format!(
                        "{} selects nodes outside the document",
                        self.source
                    )))
                }
            }
        }
        positions.sort_unstable();
        positions.dedup();
        Ok(positions.into_iter().map(|p| mirror.nodes[p]).collect())
    }

    /// Evaluate from the document node and convert the result to a string.
    /// A node result gives the string value of its first node.
    pub(crate) fn select_string(
        &self,
        xot: &Xot,
        document: Node,
        bindings: &[(String, String)],
    ) -> Result<String> {
        let (mirror, sequence) = self.evaluate(xot, document, bindings)?;
        Ok(match sequence.first() {
            None => String::new(),
            Some(Item::Node(node)) => match mirror.position(node) {
                Some(position) => tree::string_value(xot, mirror.nodes[position]),
                None => node.to_string(),
            },
            Some(_) => sequence.to_string(),
        })
    }

    fn evaluate(
        &self,
        xot: &Xot,
        document: Node,
        bindings: &[(String, String)],
    ) -> Result<(Mirror, Sequence<RNode>)> {
        // xrust panics on an undeclared prefix, so check them first
        if let Some(prefix) = used_prefixes(&self.source)
            .into_iter()
            .find(|used| *used != "xml" && !bindings.iter().any(|(bound, _)| bound == used))
        {
            return Err(DomError::UnboundPrefix(prefix.to_string()));
        }

        let eval_error = |e: XrustError| DomError::xpath_eval(format!("{}: {e}", self.source));
        let (_resolver_doc, resolver) = resolver(bindings).map_err(eval_error)?;
        let transform: Transform<RNode> =
            parse_xpath(&self.source, Some(resolver)).map_err(eval_error)?;
        let mirror = Mirror::build(xot, document).map_err(eval_error)?;

        let context = ContextBuilder::new()
            .context(vec![Item::Node(mirror.document.clone())])
            .build();
        let mut static_context = StaticContextBuilder::new()
            .message(|_| Ok(()))
            .fetcher(|_| Err(XrustError::new(ErrorKind::NotImplemented, "not implemented")))
            .parser(|_| Err(XrustError::new(ErrorKind::NotImplemented, "not implemented")))
            .build();

        let sequence = context
            .dispatch(&mut static_context, &transform)
            .map_err(eval_error)?;
        Ok((mirror, sequence))
    }
}

/// An xrust copy of a xot document.
struct Mirror {
    document: RNode,
    /// xot nodes in document order; the document node comes first
    nodes: Vec<Node>,
    /// xrust node id to index in `nodes`
    index: HashMap<String, usize>,
}

impl Mirror {
    fn build(xot: &Xot, document: Node) -> std::result::Result<Self, XrustError> {
        let mirror_doc = RNode::new_document();
        let mut mirror = Self {
            document: mirror_doc.clone(),
            nodes: vec![document],
            index: HashMap::from([(mirror_doc.get_id(), 0)]),
        };
        mirror.copy_children(xot, document, mirror_doc)?;
        Ok(mirror)
    }

    fn copy_children(
        &mut self,
        xot: &Xot,
        from: Node,
        mut to: RNode,
    ) -> std::result::Result<(), XrustError> {
        for child in tree::children(xot, from) {
            let copy = match xot.value(child) {
                Value::Element(element) => {
                    let element = self.document.new_element(qualified(xot, child, element.name()))?;
                    for (name, value) in tree::attributes(xot, child) {
                        let attribute = self.document.new_attribute(
                            qualified(xot, child, name),
                            Rc::new(XrustValue::from(value)),
                        )?;
                        element.add_attribute(attribute)?;
                    }
                    element
                }
                Value::Text(text) => self.document.new_text(Rc::new(XrustValue::from(text.get())))?,
                Value::Comment(comment) => {
                    self.document.new_comment(Rc::new(XrustValue::from(comment.get())))?
                }
                Value::ProcessingInstruction(pi) => self.document.new_processing_instruction(
                    Rc::new(QualifiedName::new(None, None, xot.local_name_str(pi.target()))),
                    Rc::new(XrustValue::from(pi.data().unwrap_or_default())),
                )?,
                _ => continue,
            };
            to.push(copy.clone())?;
            self.index.insert(copy.get_id(), self.nodes.len());
            self.nodes.push(child);
            if tree::is_element(xot, child) {
                self.copy_children(xot, child, copy)?;
            }
        }
        Ok(())
    }

    fn position(&self, node: &RNode) -> Option<usize> {
        self.index.get(&node.get_id()).copied()
    }
}

/// A xot name as xrust sees it, with the prefix in scope at `scope`.
fn qualified(xot: &Xot, scope: Node, name: NameId) -> Rc<QualifiedName> {
    let local = tree::local_name(xot, name).to_string();
    let Some(uri) = tree::namespace_uri(xot, name) else {
        return Rc::new(QualifiedName::new(None, None, local));
    };
    let prefix = tree::prefix_for(xot, scope, xot.namespace_for_name(name))
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string);
    Rc::new(QualifiedName::new(Some(uri.to_string()), prefix, local))
}

/// An element carrying one namespace declaration per binding, for xrust's
/// parser to resolve prefixes against. The element only lives as long as
/// its document, so both are returned.
fn resolver(bindings: &[(String, String)]) -> std::result::Result<(RNode, RNode), XrustError> {
    let mut document = RNode::new_document();
    let element = document.new_element(Rc::new(QualifiedName::new(None, None, "resolver")))?;
    document.push(element.clone())?;
    for (prefix, uri) in bindings {
        let declaration = document.new_namespace(
            Rc::new(XrustValue::from(uri.as_str())),
            Some(Rc::new(XrustValue::from(prefix.as_str()))),
        )?;
        element.add_namespace(declaration)?;
    }
    Ok((document, element))
}

/// Prefixes of the qualified names in a query, skipping string literals.
fn used_prefixes(source: &str) -> Vec<&str> {
    let mut prefixes = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c == '\'' || c == '"' {
            for (_, next) in chars.by_ref() {
                if next == c {
                    break;
                }
            }
            continue;
        }
        if !(c.is_alphabetic() || c == '_') {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if next.is_alphanumeric() || matches!(next, '_' | '-' | '.') {
                end = i + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let rest = &source[end..];
        if rest.starts_with(':')
            && rest[1..]
                .chars()
                .next()
                .is_some_and(|after| after.is_alphabetic() || after == '_')
        {
            prefixes.push(&source[start..end]);
        }
    }
    prefixes
}
