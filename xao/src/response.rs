//! What gets sent back to the client.

use std::io::Write;

/// A content type and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub content_type: String,
    pub body: String,
}

impl Response {
    pub fn new(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// Write CGI style: the `Content-Type` header, a blank line, the body.
    pub fn write_cgi<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "Content-Type: {}\r\n\r\n", self.content_type)?;
        out.write_all(self.body.as_bytes())?;
        out.flush()
    }
}

/// Content type for an alternate payload: XML when it opens with an XML
/// declaration, HTML otherwise.
pub fn sniff_content_type(payload: &str) -> &'static str {
    if payload.get(1..5) == Some("?xml") {
        "text/xml"
    } else {
        "text/html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sniffing_looks_at_bytes_one_to_five() {
        assert_eq!(sniff_content_type(r#"<?xml version="1.0"?><a/>"#), "text/xml");
        assert_eq!(sniff_content_type("<html><body/></html>"), "text/html");
        assert_eq!(sniff_content_type(" <?xml"), "text/html");
        assert_eq!(sniff_content_type("<?x"), "text/html");
        assert_eq!(sniff_content_type("é?xml"), "text/html");
    }

    #[test]
    fn cgi_output_has_header_and_body() {
        let mut out = Vec::new();
        Response::new("text/html", "<p>hi</p>").write_cgi(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Content-Type: text/html\r\n\r\n<p>hi</p>"
        );
    }
}
