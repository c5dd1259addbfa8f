//! Parsing factory: turns files and strings into xot trees.
//!
//! The DOM parse is attempted first. Only when it fails do we pay for a
//! second, streaming pass with quick-xml, whose job is to find the line the
//! error sits on so the message points somewhere useful.

use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use xot::{Node, ParseError, Xot};

use crate::storage;

/// A successfully parsed tree together with where it came from.
#[derive(Debug)]
pub struct Parsed {
    pub xot: Xot,
    pub document: Node,
    pub context_file: Option<PathBuf>,
    /// `<!DOCTYPE ...>` removed before the DOM parse
    pub doctype: Option<String>,
}

/// Everything known about a failed parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Short message from the parser that detected the problem
    pub message: String,
    /// Full, human readable message including line and file
    pub full_message: String,
    /// Line on or near which the error occurred, if it could be located
    pub line: Option<usize>,
    /// File the data was read from, if any
    pub context_file: Option<PathBuf>,
}

impl ParseFailure {
    fn io(path: &Path, message: String) -> Self {
        Self {
            full_message: message.clone(),
            message,
            line: None,
            context_file: Some(path.to_path_buf()),
        }
    }
}

/// Whether `target` should be read as a file rather than parsed as data.
///
/// Multi-line strings are always data; single-line strings are files only if
/// such a file exists.
pub fn is_file_target(target: &str) -> bool {
    !target.contains('\n') && Path::new(target).is_file()
}

/// Parse `target` either as a file path or as XML data.
pub fn parse_target(target: &str) -> Result<Parsed, ParseFailure> {
    if is_file_target(target) {
        parse_file(Path::new(target))
    } else {
        parse_data(target, None)
    }
}

/// Read `path` under a shared lock and parse its contents.
pub fn parse_file(path: &Path) -> Result<Parsed, ParseFailure> {
    if !path.exists() {
        return Err(ParseFailure::io(
            path,
            format!("File ({}) not found.", path.display()),
        ));
    }
    let data = storage::read_locked(path)
        .map_err(|e| ParseFailure::io(path, format!("Could not open {}: {e}", path.display())))?;
    parse_data(&data, Some(path))
}

/// Parse XML data. `context_file` only feeds error messages.
///
/// The DOM parser rejects document type declarations, so one without an
/// internal subset is cut out and handed back in [`Parsed::doctype`].
/// Internal subsets can declare entities and defaults that change the tree,
/// so those documents still fail.
pub fn parse_data(data: &str, context_file: Option<&Path>) -> Result<Parsed, ParseFailure> {
    let mut xot = Xot::new();
    let dom_error = match xot.parse(data) {
        Ok(document) => {
            debug!(file = ?context_file, "parsed document");
            return Ok(Parsed {
                xot,
                document,
                context_file: context_file.map(Path::to_path_buf),
                doctype: None,
            });
        }
        Err(err) => err,
    };

    if matches!(dom_error, ParseError::DtdUnsupported(_)) {
        let Some((doctype, rest)) = split_doctype(data) else {
            return Err(unsupported_doctype(context_file));
        };
        let mut xot = Xot::new();
        return match xot.parse(&rest) {
            Ok(document) => {
                debug!(file = ?context_file, %doctype, "parsed document with a doctype");
                Ok(Parsed {
                    xot,
                    document,
                    context_file: context_file.map(Path::to_path_buf),
                    doctype: Some(doctype),
                })
            }
            Err(err) => Err(diagnose(&rest, &err.to_string(), context_file)),
        };
    }
    Err(diagnose(data, &dom_error.to_string(), context_file))
}

/// Cut a `<!DOCTYPE>` without an internal subset out of the prolog.
fn split_doctype(data: &str) -> Option<(String, String)> {
    let mut reader = Reader::from_str(data);
    loop {
        let start = usize::try_from(reader.buffer_position()).ok()?;
        match reader.read_event().ok()? {
            Event::DocType(text) => {
                if text.contains(&b'[') {
                    return None;
                }
                let end = usize::try_from(reader.buffer_position()).ok()?;
                let doctype = data.get(start..end)?.to_string();
                let rest = format!("{}{}", data.get(..start)?, data.get(end..)?);
                return Some((doctype, rest));
            }
            Event::Start(_) | Event::Empty(_) | Event::Eof => return None,
            _ => {}
        }
    }
}

fn unsupported_doctype(context_file: Option<&Path>) -> ParseFailure {
    let in_file = context_file
        .map(|p| format!(" in the file {}", p.display()))
        .unwrap_or_default();
    let message = "document type declarations with an internal subset are not supported".to_string();
    ParseFailure {
        full_message: format!("The XML data{in_file} could not be parsed:\n {message}\n"),
        message,
        line: None,
        context_file: context_file.map(Path::to_path_buf),
    }
}

fn diagnose(data: &str, dom_error: &str, context_file: Option<&Path>) -> ParseFailure {
    let in_file = context_file
        .map(|p| format!(" in the file {}", p.display()))
        .unwrap_or_default();

    match locate_error(data) {
        Some((message, line)) => ParseFailure {
            full_message: format!(
                "The following parse error occurred on or near line {line}{in_file}:\n {message}\n"
            ),
            message,
            line: Some(line),
            context_file: context_file.map(Path::to_path_buf),
        },
        None => ParseFailure {
            full_message: format!(
                "The XML data{in_file} could not be parsed by the DOM parser, which \
                 reported the following parse error:\n {dom_error}\n"
            ),
            message: dom_error.to_string(),
            line: None,
            context_file: context_file.map(Path::to_path_buf),
        },
    }
}

/// Run a streaming parse and report the first error with its line number.
fn locate_error(data: &str) -> Option<(String, usize)> {
    let mut reader = Reader::from_str(data);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(err) => {
                let offset = usize::try_from(reader.error_position()).unwrap_or(data.len());
                return Some((err.to_string(), line_at(data, offset)));
            }
        }
    }
}

/// 1-based line number of a byte offset.
fn line_at(data: &str, offset: usize) -> usize {
    data.as_bytes()
        .iter()
        .take(offset)
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_at_counts_from_one() {
        assert_eq!(line_at("abc", 1), 1);
        assert_eq!(line_at("a\nb\nc", 4), 3);
        assert_eq!(line_at("a\n", 100), 2);
    }

    #[test]
    fn multi_line_target_is_data() {
        assert!(!is_file_target("<a>\n</a>"));
    }

    #[test]
    fn mismatched_end_tag_is_located() {
        let failure = parse_data("<a>\n<b>\n</c>\n</a>", None).unwrap_err();
        assert_eq!(failure.line, Some(3));
        assert!(failure.full_message.contains("on or near line 3"));
    }

    #[test]
    fn doctype_without_subset_is_split_off() {
        let data = "<?xml version=\"1.0\"?>\n<!DOCTYPE html SYSTEM \"about:legacy-compat\">\n<html/>";
        let parsed = parse_data(data, None).unwrap();
        assert_eq!(
            parsed.doctype.as_deref(),
            Some("<!DOCTYPE html SYSTEM \"about:legacy-compat\">")
        );
        let root = parsed.xot.document_element(parsed.document).unwrap();
        assert_eq!(parsed.xot.to_string(root).unwrap(), "<html/>");
    }

    #[test]
    fn doctype_with_internal_subset_is_rejected() {
        let failure = parse_data("<!DOCTYPE a [<!ENTITY e \"x\">]><a>&e;</a>", None).unwrap_err();
        assert!(failure.message.contains("internal subset"), "{}", failure.message);
        assert!(!failure.full_message.contains("streaming"));
    }

    #[test]
    fn missing_file_is_reported() {
        let failure = parse_file(Path::new("/definitely/not/here.xml")).unwrap_err();
        assert!(failure.full_message.contains("not found"));
        assert_eq!(failure.line, None);
    }
}
