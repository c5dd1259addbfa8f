//! Name validation for elements and stylesheet parameters.

use regex::Regex;
use std::sync::LazyLock;

/// XML `Name` production (XML 1.0 fifth edition), restricted to at most one
/// colon that is neither leading nor trailing, so the result is also a QName.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static QNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let start = r"A-Z_a-z\x{C0}-\x{D6}\x{D8}-\x{F6}\x{F8}-\x{2FF}\x{370}-\x{37D}\x{37F}-\x{1FFF}\x{200C}-\x{200D}\x{2070}-\x{218F}\x{2C00}-\x{2FEF}\x{3001}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFFD}\x{10000}-\x{EFFFF}";
    let rest = format!(r"{start}\-.0-9\x{{B7}}\x{{300}}-\x{{36F}}\x{{203F}}-\x{{2040}}");
    let ncname = format!("[{start}][{rest}]*");
    Regex::new(&format!("^{ncname}(:{ncname})?$")).expect("valid regex")
});

/// Safe parameter name: a letter or underscore followed by word characters.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SAFE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Check that `name` can be used as an element name.
///
/// # Examples
/// ```
/// use xao_dom::names::is_valid_name;
///
/// assert!(is_valid_name("article"));
/// assert!(is_valid_name("xao:exceptions"));
/// assert!(!is_valid_name("1st"));
/// assert!(!is_valid_name("a b"));
/// ```
pub fn is_valid_name(name: &str) -> bool {
    QNAME_PATTERN.is_match(name)
}

/// Check that `name` is single-line, does not begin with a digit and only
/// holds word characters. Used for XSL parameter names.
///
/// # Examples
/// ```
/// use xao_dom::names::is_safe_name;
///
/// assert!(is_safe_name("page_title"));
/// assert!(!is_safe_name("2col"));
/// assert!(!is_safe_name("my-param"));
/// ```
pub fn is_safe_name(name: &str) -> bool {
    SAFE_NAME_PATTERN.is_match(name)
}

/// Split a qualified name into its optional prefix and local part.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_unicode_names() {
        assert!(is_valid_name("übersicht"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("a.b-c"));
    }

    #[test]
    fn rejects_malformed_qnames() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(":lead"));
        assert!(!is_valid_name("trail:"));
        assert!(!is_valid_name("a:b:c"));
        assert!(!is_valid_name("-dash"));
    }

    #[test]
    fn safe_name_rejects_newlines_and_empty() {
        assert!(!is_safe_name("line\nbreak"));
        assert!(!is_safe_name(""));
        assert!(is_safe_name("_"));
    }

    #[test]
    fn split_qname_parts() {
        assert_eq!(split_qname("xao:param"), (Some("xao"), "param"));
        assert_eq!(split_qname("param"), (None, "param"));
    }
}
