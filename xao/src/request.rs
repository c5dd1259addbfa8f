//! Debug switches carried on the request query string.

use url::form_urlencoded;

/// Query flag: send the raw document as plain text
pub const FLAG_XML: &str = "xao:XML";
/// Query flag: send the payload as plain text
pub const FLAG_TEXT: &str = "xao:Text";
/// Query flag: send the stylesheet instead of the transformation result
pub const FLAG_XSL: &str = "xao:XSL";

/// Debug flags present on a request. They only take effect when the
/// application runs in debug mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    pub xml: bool,
    pub text: bool,
    pub xsl: bool,
}

impl DebugFlags {
    /// Read the flags from a query string, with or without the leading `?`.
    /// A flag counts as set when its name is present, whatever its value.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut flags = Self::default();
        for (name, _) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                FLAG_XML => flags.xml = true,
                FLAG_TEXT => flags.text = true,
                FLAG_XSL => flags.xsl = true,
                _ => {}
            }
        }
        flags
    }

    pub fn any(&self) -> bool {
        self.xml || self.text || self.xsl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_read_by_name() {
        let flags = DebugFlags::from_query("?page=2&xao:XML&xao%3AXSL=1");
        assert_eq!(
            flags,
            DebugFlags {
                xml: true,
                text: false,
                xsl: true
            }
        );
    }

    #[test]
    fn unrelated_query_sets_nothing() {
        assert!(!DebugFlags::from_query("xml=1&Text&xao:xml").any());
        assert!(!DebugFlags::from_query("").any());
    }
}
