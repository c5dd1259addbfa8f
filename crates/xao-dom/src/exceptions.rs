//! Tree-resident error records.
//!
//! An error raised against a document is not kept on a side stack: it is
//! written into the document itself, under a single `exceptions` container
//! below the root element. A stylesheet can then render errors with an
//! ordinary template. The same records are mirrored as [`Exception`] values
//! so Rust callers can inspect them without walking the tree.
//!
//! ```xml
//! <xao:exceptions xmlns:xao="http://github.com/tezza1971/XAO-PHP/schema/xao_1-0.xsd">
//!   <xao:exception code="DomDocInit">
//!     <xao:msg>The following parse error occurred ...</xao:msg>
//!     <xao:stack><xao:call file="src/main.rs" line="12" column="5"/></xao:stack>
//!   </xao:exception>
//! </xao:exceptions>
//! ```

use std::panic::Location;

use xot::{Node, Xot};

use crate::names;

/// Namespace of every element XAO generates on its own behalf.
pub const XAO_NAMESPACE: &str = "http://github.com/tezza1971/XAO-PHP/schema/xao_1-0.xsd";

/// Prefix bound to [`XAO_NAMESPACE`] unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "xao";

const EMPTY_MESSAGE: &str = "The error message was empty.";

/// Source location an exception was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

/// One error record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub message: String,
    pub attributes: Vec<(String, String)>,
    pub location: Option<CallSite>,
}

impl Exception {
    /// Build a record, normalising the message and dropping empty attributes
    /// and attributes whose name is not an unprefixed XML name.
    ///
    /// When the attributes name a `class`, `function` and `line`, the message
    /// is prefixed with that context.
    pub fn new(
        message: &str,
        attributes: &[(&str, &str)],
        location: Option<CallSite>,
    ) -> Self {
        let attributes: Vec<(String, String)> = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .filter(|(k, v)| !v.is_empty() && names::is_valid_name(k) && !k.contains(':'))
            .collect();

        let lookup = |name: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        let mut full = String::new();
        if let (Some(class), Some(function), Some(line)) =
            (lookup("class"), lookup("function"), lookup("line"))
        {
            full.push_str(&format!("In method {class}::{function}() on line {line}\n\n"));
        }

        let message = message.trim();
        full.push_str(if message.is_empty() { EMPTY_MESSAGE } else { message });

        Self {
            message: full,
            attributes,
            location,
        }
    }

    /// Value of an attribute on this record.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `code` attribute, if any.
    pub fn code(&self) -> Option<&str> {
        self.attribute("code")
    }
}

/// Writes [`Exception`] records below an `exceptions` container.
#[derive(Debug, Clone)]
pub(crate) struct ExceptionWriter {
    container: Node,
    create_stack_trace: bool,
}

impl ExceptionWriter {
    /// Create the container element under `parent`, declaring `prefix` for
    /// the XAO namespace on it.
    pub(crate) fn create(xot: &mut Xot, parent: Node, prefix: &str) -> Result<Self, xot::Error> {
        let ns = xot.add_namespace(XAO_NAMESPACE);
        let name = xot.add_name_ns("exceptions", ns);
        let container = xot.new_element(name);
        let prefix_id = xot.add_prefix(prefix);
        xot.namespaces_mut(container).insert(prefix_id, ns);
        xot.append(parent, container)?;
        Ok(Self {
            container,
            create_stack_trace: true,
        })
    }

    pub(crate) fn container(&self) -> Node {
        self.container
    }

    pub(crate) fn set_create_stack_trace(&mut self, enabled: bool) {
        self.create_stack_trace = enabled;
    }

    /// Append one `exception` element and return it.
    pub(crate) fn write(&self, xot: &mut Xot, exception: &Exception) -> Result<Node, xot::Error> {
        let ns = xot.add_namespace(XAO_NAMESPACE);

        let error_name = xot.add_name_ns("exception", ns);
        let error = xot.new_element(error_name);
        xot.append(self.container, error)?;

        for (key, value) in &exception.attributes {
            let attr = xot.add_name(key);
            xot.attributes_mut(error).insert(attr, value.clone());
        }

        let msg_name = xot.add_name_ns("msg", ns);
        let msg = xot.new_element(msg_name);
        xot.append(error, msg)?;
        let text = xot.new_text(&exception.message);
        xot.append(msg, text)?;

        if self.create_stack_trace {
            if let Some(site) = exception.location {
                let stack_name = xot.add_name_ns("stack", ns);
                let stack = xot.new_element(stack_name);
                xot.append(error, stack)?;

                let call_name = xot.add_name_ns("call", ns);
                let call = xot.new_element(call_name);
                let file = xot.add_name("file");
                let line = xot.add_name("line");
                let column = xot.add_name("column");
                let mut attributes = xot.attributes_mut(call);
                attributes.insert(file, site.file.to_string());
                attributes.insert(line, site.line.to_string());
                attributes.insert(column, site.column.to_string());
                xot.append(stack, call)?;
            }
        }

        Ok(error)
    }
}
