//! The document wrapper.
//!
//! [`DomDoc`] owns a xot arena holding exactly one document. However it is
//! constructed, it always ends up with a root element: when parsing or
//! adoption fails, a `<root/>` placeholder is put in its place and the
//! failure is recorded as an exception with `code="DomDocInit"`, so the
//! problem still reaches whatever renders the document.

use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};
use xot::{NameId, NamespaceId, Node, PrefixId, Value, Xot};

use crate::error::{DomError, Result};
use crate::exceptions::{CallSite, Exception, ExceptionWriter, DEFAULT_PREFIX, XAO_NAMESPACE};
use crate::factory::{self, Parsed};
use crate::names;
use crate::storage;
use crate::tags::CustomTags;
use crate::tree;
use crate::xpath::XPath;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// How a document came into being.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocMode {
    /// Fresh document built from a root element name
    New,
    /// Parsed from a file read under a shared lock
    ReadFile,
    /// Adopted from an existing xot tree
    Reference,
    /// Parsed from a string
    Data,
}

/// Callback invoked for every exception thrown on a document.
pub type ErrorCallback = Box<dyn FnMut(&Exception)>;

/// An XML document with helpers for building response content.
pub struct DomDoc {
    pub(crate) xot: Xot,
    document: Node,
    root: Node,
    mode: DocMode,
    source_path: Option<PathBuf>,
    namespace_prefix: String,
    exceptions: Option<ExceptionWriter>,
    pub(crate) records: Vec<Exception>,
    stylesheet_href: Option<String>,
    /// Document type declaration split off before parsing, written back verbatim
    doctype: Option<String>,
    error_callback: Option<ErrorCallback>,
    create_stack_trace: bool,
    pub(crate) custom_tags: CustomTags,
}

impl fmt::Debug for DomDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomDoc")
            .field("mode", &self.mode)
            .field("source_path", &self.source_path)
            .field("namespace_prefix", &self.namespace_prefix)
            .field("exceptions", &self.records.len())
            .field("stylesheet_href", &self.stylesheet_href)
            .field("doctype", &self.doctype)
            .field("custom_tags", &self.custom_tags)
            .finish_non_exhaustive()
    }
}

impl DomDoc {
    /// Create a document holding a single root element.
    ///
    /// A root name with the XAO prefix is placed in the XAO namespace; any
    /// other prefix has nothing to bind to and aborts to the placeholder.
    #[track_caller]
    pub fn new(root_name: &str) -> Self {
        let location = Location::caller();
        match blank_tree(root_name) {
            Ok((xot, document, root)) => Self::assemble(xot, document, root, DocMode::New, None),
            Err(message) => Self::aborted(DocMode::New, None, &message, location),
        }
    }

    /// Parse the file at `path`.
    #[track_caller]
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let location = Location::caller();
        let path = path.as_ref();
        match factory::parse_file(path) {
            Ok(parsed) => Self::from_parsed(parsed, DocMode::ReadFile, location),
            Err(failure) => Self::aborted(
                DocMode::ReadFile,
                Some(path.to_path_buf()),
                &failure.full_message,
                location,
            ),
        }
    }

    /// Parse XML held in a string.
    #[track_caller]
    pub fn from_data(data: &str) -> Self {
        let location = Location::caller();
        match factory::parse_data(data, None) {
            Ok(parsed) => Self::from_parsed(parsed, DocMode::Data, location),
            Err(failure) => Self::aborted(DocMode::Data, None, &failure.full_message, location),
        }
    }

    /// Read `target` as a file when it is a single line naming an existing
    /// file, otherwise parse it as data.
    #[track_caller]
    pub fn from_target(target: &str) -> Self {
        if factory::is_file_target(target) {
            Self::from_file(target)
        } else {
            Self::from_data(target)
        }
    }

    /// Adopt a document node that already lives in `xot`.
    #[track_caller]
    pub fn from_reference(xot: Xot, document: Node) -> Self {
        let location = Location::caller();
        if !xot.is_document(document) {
            return Self::aborted(
                DocMode::Reference,
                None,
                "The reference is not a document node.",
                location,
            );
        }
        match tree::document_element(&xot, document) {
            Some(root) => Self::assemble(xot, document, root, DocMode::Reference, None),
            None => Self::aborted(
                DocMode::Reference,
                None,
                "The reference document is not a valid XML document: it has no document element.",
                location,
            ),
        }
    }

    fn from_parsed(parsed: Parsed, mode: DocMode, location: &'static Location<'static>) -> Self {
        let Parsed {
            xot,
            document,
            context_file,
            doctype,
        } = parsed;
        match tree::document_element(&xot, document) {
            Some(root) => {
                let mut doc = Self::assemble(xot, document, root, mode, context_file);
                doc.doctype = doctype;
                doc
            }
            None => Self::aborted(mode, context_file, "The document has no root element.", location),
        }
    }

    fn assemble(
        xot: Xot,
        document: Node,
        root: Node,
        mode: DocMode,
        source_path: Option<PathBuf>,
    ) -> Self {
        debug!(?mode, path = ?source_path, "document initialised");
        Self {
            xot,
            document,
            root,
            mode,
            source_path,
            namespace_prefix: DEFAULT_PREFIX.to_string(),
            exceptions: None,
            records: Vec::new(),
            stylesheet_href: None,
            doctype: None,
            error_callback: None,
            create_stack_trace: true,
            custom_tags: CustomTags::default(),
        }
    }

    /// Substitute a `<root/>` document and record why.
    fn aborted(
        mode: DocMode,
        source_path: Option<PathBuf>,
        message: &str,
        location: &'static Location<'static>,
    ) -> Self {
        let (xot, document, root) = placeholder_tree();
        let mut doc = Self::assemble(xot, document, root, mode, source_path);
        doc.record(Exception::new(
            message,
            &[("code", "DomDocInit")],
            Some(CallSite::from(location)),
        ));
        doc
    }

    pub fn mode(&self) -> DocMode {
        self.mode
    }

    /// The root element.
    pub fn root(&self) -> Node {
        self.root
    }

    /// The document node above the root element.
    pub fn document(&self) -> Node {
        self.document
    }

    pub fn xot(&self) -> &Xot {
        &self.xot
    }

    /// Direct access to the arena for manipulation the helpers don't cover.
    pub fn xot_mut(&mut self) -> &mut Xot {
        &mut self.xot
    }

    /// File the document was read from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn namespace_prefix(&self) -> &str {
        &self.namespace_prefix
    }

    /// Change the prefix used for XAO elements created from now on.
    pub fn set_namespace_prefix(&mut self, prefix: &str) -> Result<()> {
        if !names::is_valid_name(prefix) || prefix.contains(':') {
            return Err(DomError::InvalidName(prefix.to_string()));
        }
        self.namespace_prefix = prefix.to_string();
        Ok(())
    }

    /// Whether thrown exceptions carry a `stack` element with the call site.
    pub fn set_create_stack_trace(&mut self, enabled: bool) {
        self.create_stack_trace = enabled;
        if let Some(writer) = self.exceptions.as_mut() {
            writer.set_create_stack_trace(enabled);
        }
    }

    // ---- building content ----

    /// Append a new element with optional text content below the root.
    pub fn append_to_root(&mut self, name: &str, content: &str) -> Result<Node> {
        let root = self.root;
        self.append_to_node(root, name, content)
    }

    /// Append a new element with optional text content below `stub`.
    pub fn append_to_node(&mut self, stub: Node, name: &str, content: &str) -> Result<Node> {
        if !self.is_element(stub) {
            return Err(DomError::NotAnElement("append_to_node"));
        }
        let (element_name, declaration) = self.element_name_in_scope(stub, name)?;
        let element = self.xot.new_element(element_name);
        if let Some((prefix, ns)) = declaration {
            self.xot.namespaces_mut(element).insert(prefix, ns);
        }
        self.xot.append(stub, element)?;
        if !content.is_empty() {
            let text = self.xot.new_text(content);
            self.xot.append(element, text)?;
        }
        Ok(element)
    }

    /// Name for a new element under `scope`, plus a namespace declaration to
    /// put on it when the name uses the XAO prefix and nothing binds it yet.
    fn element_name_in_scope(
        &mut self,
        scope: Node,
        name: &str,
    ) -> Result<(NameId, Option<(PrefixId, NamespaceId)>)> {
        if !names::is_valid_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        match names::split_qname(name) {
            (None, local) => {
                let id = match tree::resolve_prefix(&self.xot, scope, "") {
                    Some(ns) => self.xot.add_name_ns(local, ns),
                    None => self.xot.add_name(local),
                };
                Ok((id, None))
            }
            (Some(prefix), local) => {
                if let Some(ns) = tree::resolve_prefix(&self.xot, scope, prefix) {
                    return Ok((self.xot.add_name_ns(local, ns), None));
                }
                if prefix == self.namespace_prefix {
                    let ns = self.xot.add_namespace(XAO_NAMESPACE);
                    let prefix_id = self.xot.add_prefix(prefix);
                    return Ok((self.xot.add_name_ns(local, ns), Some((prefix_id, ns))));
                }
                Err(DomError::UnboundPrefix(prefix.to_string()))
            }
        }
    }

    /// The `index`th element (from 0) matching `name` in document order.
    pub fn get_one_el(&self, name: &str, index: usize) -> Option<Node> {
        self.elements_by_tag_name(name).into_iter().nth(index)
    }

    /// Every element matching `name`, in document order.
    ///
    /// `*` matches all elements, an unprefixed name matches on local name
    /// and `prefix:local` resolves the prefix at each candidate.
    pub fn elements_by_tag_name(&self, name: &str) -> Vec<Node> {
        let (prefix, local) = names::split_qname(name);
        tree::descendants_or_self(&self.xot, self.document)
            .into_iter()
            .filter(|node| {
                let Some(id) = tree::element_name(&self.xot, *node) else {
                    return false;
                };
                if name == "*" {
                    return true;
                }
                if tree::local_name(&self.xot, id) != local {
                    return false;
                }
                match prefix {
                    None => true,
                    Some(prefix) => tree::resolve_prefix(&self.xot, *node, prefix)
                        .is_some_and(|ns| ns == self.xot.namespace_for_name(id)),
                }
            })
            .collect()
    }

    /// Set attributes on an element from name/value pairs.
    ///
    /// `xmlns` and `xmlns:p` names declare namespaces instead.
    pub fn set_attributes(&mut self, element: Node, pairs: &[(&str, &str)]) -> Result<()> {
        if !self.is_element(element) {
            return Err(DomError::NotAnElement("set_attributes"));
        }
        for (name, value) in pairs {
            if *name == "xmlns" || name.starts_with("xmlns:") {
                let prefix = name.strip_prefix("xmlns:").unwrap_or("");
                let prefix_id = self.xot.add_prefix(prefix);
                let ns = self.xot.add_namespace(value);
                self.xot.namespaces_mut(element).insert(prefix_id, ns);
                continue;
            }
            let id = self.attribute_name(element, name)?;
            self.xot.attributes_mut(element).insert(id, value.to_string());
        }
        Ok(())
    }

    fn attribute_name(&mut self, element: Node, name: &str) -> Result<NameId> {
        if !names::is_valid_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        match names::split_qname(name) {
            (None, local) => Ok(self.xot.add_name(local)),
            (Some(prefix), local) => {
                let ns = tree::resolve_prefix(&self.xot, element, prefix)
                    .ok_or_else(|| DomError::UnboundPrefix(prefix.to_string()))?;
                Ok(self.xot.add_name_ns(local, ns))
            }
        }
    }

    /// Find an existing attribute by name as written at `element`.
    fn find_attribute(&self, element: Node, name: &str) -> Option<(NameId, String)> {
        let (prefix, local) = names::split_qname(name);
        let wanted_ns = match prefix {
            Some(prefix) => Some(tree::resolve_prefix(&self.xot, element, prefix)?),
            None => None,
        };
        tree::attributes(&self.xot, element)
            .into_iter()
            .find(|(id, _)| {
                tree::local_name(&self.xot, *id) == local
                    && match wanted_ns {
                        Some(ns) => self.xot.namespace_for_name(*id) == ns,
                        None => tree::namespace_uri(&self.xot, *id).is_none(),
                    }
            })
    }

    /// Value of an attribute, `None` when absent or `element` is not one.
    pub fn attribute(&self, element: Node, name: &str) -> Option<String> {
        self.find_attribute(element, name).map(|(_, value)| value)
    }

    /// Value of the attribute `local` in namespace `namespace`, whatever
    /// prefix the document uses for it.
    pub fn attribute_ns(&self, element: Node, namespace: &str, local: &str) -> Option<String> {
        tree::attributes(&self.xot, element)
            .into_iter()
            .find(|(id, _)| {
                tree::local_name(&self.xot, *id) == local
                    && tree::namespace_uri(&self.xot, *id) == Some(namespace)
            })
            .map(|(_, value)| value)
    }

    /// Remove an attribute. Returns whether it existed.
    pub fn remove_attribute(&mut self, element: Node, name: &str) -> Result<bool> {
        if !self.is_element(element) {
            return Err(DomError::NotAnElement("remove_attribute"));
        }
        match self.find_attribute(element, name) {
            Some((id, _)) => {
                self.xot.attributes_mut(element).remove(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the children of `element` with a single text node.
    pub fn set_content(&mut self, element: Node, content: &str) -> Result<()> {
        if !self.is_element(element) {
            return Err(DomError::NotAnElement("set_content"));
        }
        let children: Vec<Node> = tree::children(&self.xot, element).collect();
        for child in children {
            self.xot.remove(child)?;
        }
        if !content.is_empty() {
            let text = self.xot.new_text(content);
            self.xot.append(element, text)?;
        }
        Ok(())
    }

    /// Concatenated text below `node`.
    pub fn text_content(&self, node: Node) -> String {
        tree::string_value(&self.xot, node)
    }

    pub fn local_name(&self, node: Node) -> Option<&str> {
        tree::element_name(&self.xot, node).map(|id| tree::local_name(&self.xot, id))
    }

    pub fn namespace_uri(&self, node: Node) -> Option<&str> {
        tree::element_name(&self.xot, node).and_then(|id| tree::namespace_uri(&self.xot, id))
    }

    /// Name as written, with the prefix in scope.
    pub fn qualified_name(&self, node: Node) -> Option<String> {
        tree::qualified_name(&self.xot, node)
    }

    /// Element children of `node` in order.
    pub fn element_children(&self, node: Node) -> Vec<Node> {
        tree::children(&self.xot, node)
            .filter(|child| tree::is_element(&self.xot, *child))
            .collect()
    }

    pub fn parent(&self, node: Node) -> Option<Node> {
        self.xot.parent(node)
    }

    pub fn is_element(&self, node: Node) -> bool {
        tree::is_element(&self.xot, node)
    }

    /// See [`names::is_valid_name`].
    pub fn is_valid_name(name: &str) -> bool {
        names::is_valid_name(name)
    }

    /// See [`names::is_safe_name`].
    pub fn is_safe_name(name: &str) -> bool {
        names::is_safe_name(name)
    }

    // ---- queries ----

    /// Run a path query from the document node.
    pub fn xpath_nodes(&self, expr: &str) -> Result<Vec<Node>> {
        self.select(&XPath::compile(expr)?)
    }

    /// Run a path query and convert the result to a string.
    pub fn xpath_string(&self, expr: &str) -> Result<String> {
        XPath::compile(expr)?.select_string(&self.xot, self.document, &self.query_bindings())
    }

    pub(crate) fn select(&self, query: &XPath) -> Result<Vec<Node>> {
        query.select_nodes(&self.xot, self.document, &self.query_bindings())
    }

    /// Prefixes a query may use: every prefixed declaration in the document,
    /// the first one winning, and the XAO prefix.
    fn query_bindings(&self) -> Vec<(String, String)> {
        let mut bindings: Vec<(String, String)> = Vec::new();
        for node in tree::descendants_or_self(&self.xot, self.root) {
            for (prefix, ns) in tree::declarations(&self.xot, node) {
                let prefix = self.xot.prefix_str(prefix);
                if prefix.is_empty() || bindings.iter().any(|(bound, _)| bound == prefix) {
                    continue;
                }
                bindings.push((prefix.to_string(), self.xot.namespace_str(ns).to_string()));
            }
        }
        if !bindings.iter().any(|(bound, _)| *bound == self.namespace_prefix) {
            bindings.push((self.namespace_prefix.clone(), XAO_NAMESPACE.to_string()));
        }
        bindings
    }

    // ---- serialization ----

    /// The whole document with an XML declaration, the document type
    /// declaration it was parsed with and, when set, the stylesheet
    /// processing instruction.
    pub fn xml_doc(&self) -> Result<String> {
        let mut out = String::from(XML_DECLARATION);
        out.push('\n');
        if let Some(doctype) = &self.doctype {
            out.push_str(doctype);
            out.push('\n');
        }
        if let Some(href) = &self.stylesheet_href {
            out.push_str(&format!(
                r#"<?xml-stylesheet type="text/xsl" href="{}"?>"#,
                escape_attribute(href)
            ));
            out.push('\n');
        }
        out.push_str(&self.xot.to_string(self.document)?);
        Ok(out)
    }

    /// The root element and everything below it, without a declaration.
    pub fn xml_frag(&self) -> Result<String> {
        Ok(self.xot.to_string(self.root)?)
    }

    /// Overwrite an existing file with [`xml_doc`](Self::xml_doc).
    pub fn commit_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        storage::write_locked(path, &self.xml_doc()?)?;
        debug!(path = %path.display(), "document committed");
        Ok(())
    }

    /// Point the document at an XSLT stylesheet for client-side rendering.
    ///
    /// Only one stylesheet instruction is kept; a parsed one is dropped.
    pub fn set_stylesheet_pi(&mut self, href: &str) -> Result<()> {
        let existing: Vec<Node> = tree::children(&self.xot, self.document)
            .filter(|node| matches!(self.xot.value(*node), Value::ProcessingInstruction(_)))
            .filter(|node| {
                self.xot
                    .to_string(*node)
                    .is_ok_and(|text| text.starts_with("<?xml-stylesheet"))
            })
            .collect();
        for node in existing {
            self.xot.remove(node)?;
        }
        self.stylesheet_href = Some(href.to_string());
        Ok(())
    }

    pub fn stylesheet_pi(&self) -> Option<&str> {
        self.stylesheet_href.as_deref()
    }

    // ---- errors ----

    /// Record an error in the document.
    ///
    /// The error becomes an `exception` element below the `exceptions`
    /// container (created on first use) and an [`Exception`] record. Returns
    /// the new element.
    #[track_caller]
    pub fn throw(&mut self, message: &str, attributes: &[(&str, &str)]) -> Option<Node> {
        let location = CallSite::from(Location::caller());
        self.record(Exception::new(message, attributes, Some(location)))
    }

    pub(crate) fn record(&mut self, exception: Exception) -> Option<Node> {
        warn!(code = exception.code().unwrap_or_default(), "{}", exception.message);
        if let Some(callback) = self.error_callback.as_mut() {
            callback(&exception);
        }
        let node = match self.write_exception(&exception) {
            Ok(node) => Some(node),
            Err(err) => {
                error!(%err, "could not write exception into the document");
                None
            }
        };
        self.records.push(exception);
        node
    }

    fn write_exception(&mut self, exception: &Exception) -> std::result::Result<Node, xot::Error> {
        let writer = match &self.exceptions {
            Some(writer) if self.is_live_container(writer.container()) => writer.clone(),
            _ => {
                let mut writer =
                    ExceptionWriter::create(&mut self.xot, self.root, &self.namespace_prefix)?;
                writer.set_create_stack_trace(self.create_stack_trace);
                self.exceptions = Some(writer.clone());
                writer
            }
        };
        writer.write(&mut self.xot, exception)
    }

    /// Whether `node` is still an `exceptions` element inside this document.
    /// Edits through the helpers or the arena can remove the container, and
    /// the arena may hand its slot to a new node.
    fn is_live_container(&self, node: Node) -> bool {
        !self.xot.is_removed(node)
            && self.local_name(node) == Some("exceptions")
            && self.namespace_uri(node) == Some(XAO_NAMESPACE)
            && tree::ancestors_or_self(&self.xot, node).any(|n| n == self.document)
    }

    /// Every exception recorded on this document, including those carried
    /// in by consumed documents.
    pub fn exceptions(&self) -> &[Exception] {
        &self.records
    }

    pub fn has_exceptions(&self) -> bool {
        !self.records.is_empty()
    }

    /// The `exceptions` container element, once one exists and while it is
    /// still part of the document.
    pub fn exceptions_node(&self) -> Option<Node> {
        self.exceptions
            .as_ref()
            .map(ExceptionWriter::container)
            .filter(|container| self.is_live_container(*container))
    }

    /// Call `callback` for every exception thrown from now on.
    pub fn set_error_callback(&mut self, callback: impl FnMut(&Exception) + 'static) {
        self.error_callback = Some(Box::new(callback));
    }
}

/// A document with a single root element.
fn blank_tree(root_name: &str) -> std::result::Result<(Xot, Node, Node), String> {
    if !names::is_valid_name(root_name) {
        return Err(format!("{root_name} is not a valid name for a root element."));
    }
    let mut xot = Xot::new();
    let (name, declaration) = match names::split_qname(root_name) {
        (None, local) => (xot.add_name(local), None),
        (Some(DEFAULT_PREFIX), local) => {
            let ns = xot.add_namespace(XAO_NAMESPACE);
            let prefix = xot.add_prefix(DEFAULT_PREFIX);
            (xot.add_name_ns(local, ns), Some((prefix, ns)))
        }
        (Some(prefix), _) => {
            return Err(format!(
                "The prefix {prefix} of the root element {root_name} is not bound to a namespace."
            ))
        }
    };
    let root = xot.new_element(name);
    if let Some((prefix, ns)) = declaration {
        xot.namespaces_mut(root).insert(prefix, ns);
    }
    let document = xot.new_document();
    xot.append(document, root).map_err(|e| e.to_string())?;
    Ok((xot, document, root))
}

#[allow(clippy::expect_used)] // A fresh document always accepts a single element child
fn placeholder_tree() -> (Xot, Node, Node) {
    blank_tree("root").expect("placeholder document")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
