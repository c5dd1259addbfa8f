//! Small read helpers over a xot arena shared by the document wrapper and
//! the path evaluator.

use xot::{NameId, NamespaceId, Node, PrefixId, Value, Xot};

/// Whether `node` is an element.
pub(crate) fn is_element(xot: &Xot, node: Node) -> bool {
    matches!(xot.value(node), Value::Element(_))
}

/// Name of an element node.
pub(crate) fn element_name(xot: &Xot, node: Node) -> Option<NameId> {
    xot.element(node).map(|element| element.name().clone())
}

/// Local part of a name.
pub(crate) fn local_name(xot: &Xot, name: NameId) -> &str {
    xot.local_name_str(name)
}

/// Namespace URI of a name, `None` for the empty namespace.
pub(crate) fn namespace_uri(xot: &Xot, name: NameId) -> Option<&str> {
    let uri = xot.namespace_str(xot.namespace_for_name(name));
    (!uri.is_empty()).then_some(uri)
}

/// Namespace declarations made directly on `node`.
pub(crate) fn declarations(xot: &Xot, node: Node) -> Vec<(PrefixId, NamespaceId)> {
    if !is_element(xot, node) {
        return Vec::new();
    }
    xot.namespaces(node)
        .iter()
        .map(|(prefix, ns)| (prefix.clone(), ns.clone()))
        .collect()
}

/// Walk from `node` up to the document node.
pub(crate) fn ancestors_or_self(xot: &Xot, node: Node) -> impl Iterator<Item = Node> + '_ {
    std::iter::successors(Some(node), move |n| xot.parent(*n))
}

/// Resolve `prefix` through the declarations in scope at `node`. The `xml`
/// prefix is always bound.
pub(crate) fn resolve_prefix(xot: &Xot, node: Node, prefix: &str) -> Option<NamespaceId> {
    if prefix == "xml" {
        return Some(xot.xml_namespace());
    }
    ancestors_or_self(xot, node).find_map(|n| {
        declarations(xot, n)
            .into_iter()
            .find(|(p, _)| xot.prefix_str(*p) == prefix)
            .map(|(_, ns)| ns)
    })
}

/// Find the prefix bound to `ns` in scope at `node`.
pub(crate) fn prefix_for(xot: &Xot, node: Node, ns: NamespaceId) -> Option<&str> {
    ancestors_or_self(xot, node).find_map(|n| {
        declarations(xot, n)
            .into_iter()
            .find(|(_, bound)| *bound == ns)
            .map(|(p, _)| xot.prefix_str(p))
    })
}

/// Qualified name of an element as it would be written at its position.
pub(crate) fn qualified_name(xot: &Xot, node: Node) -> Option<String> {
    let name = element_name(xot, node)?;
    let local = local_name(xot, name);
    let ns = xot.namespace_for_name(name);
    match prefix_for(xot, node, ns) {
        Some(prefix) if !prefix.is_empty() && namespace_uri(xot, name).is_some() => {
            Some(format!("{prefix}:{local}"))
        }
        _ => Some(local.to_string()),
    }
}

/// Tree children, without attribute or namespace nodes.
pub(crate) fn children(xot: &Xot, node: Node) -> impl Iterator<Item = Node> + '_ {
    xot.children(node).filter(move |n| is_tree_node(xot, *n))
}

/// `node` and every tree node below it in document order.
pub(crate) fn descendants_or_self(xot: &Xot, node: Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pending = vec![node];
    while let Some(next) = pending.pop() {
        out.push(next);
        let kids: Vec<Node> = children(xot, next).collect();
        pending.extend(kids.into_iter().rev());
    }
    out
}

fn is_tree_node(xot: &Xot, node: Node) -> bool {
    !matches!(xot.value(node), Value::Attribute(_) | Value::Namespace(_))
}

/// Attribute name/value pairs of an element.
pub(crate) fn attributes(xot: &Xot, node: Node) -> Vec<(NameId, String)> {
    if !is_element(xot, node) {
        return Vec::new();
    }
    xot.attributes(node)
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

/// String value: concatenated text of the subtree, or the node's own text.
pub(crate) fn string_value(xot: &Xot, node: Node) -> String {
    match xot.value(node) {
        Value::Text(text) => text.get().to_string(),
        Value::Comment(comment) => comment.get().to_string(),
        Value::Element(_) | Value::Document => descendants_or_self(xot, node)
            .into_iter()
            .filter_map(|n| match xot.value(n) {
                Value::Text(text) => Some(text.get()),
                _ => None,
            })
            .collect(),
        _ => String::new(),
    }
}

/// The document element of a document node.
pub(crate) fn document_element(xot: &Xot, document: Node) -> Option<Node> {
    children(xot, document).find(|n| is_element(xot, *n))
}
