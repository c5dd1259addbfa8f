//! The application document.
//!
//! An [`AppDoc`] is the response document of a request: content is built on
//! it through the [`DomDoc`] API it dereferences to, it is optionally
//! transformed on the server, and [`AppDoc::send`] picks the content type and
//! body that go back to the client.

use std::fmt;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};
use xao_dom::{DomDoc, Node, XAO_NAMESPACE};
use xao_transform::{CacheParams, ResultCache, Transformer, XmlInput, XslParams};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::request::DebugFlags;
use crate::response::{sniff_content_type, Response};

pub struct AppDoc {
    doc: DomDoc,
    config: AppConfig,
    flags: DebugFlags,
    style_path: Option<String>,
    xsl_params: XslParams,
    xslt_cache: Option<CacheParams>,
    doc_cache: Option<CacheParams>,
    cache: Option<Arc<dyn ResultCache>>,
    alt_payload: Option<String>,
}

impl fmt::Debug for AppDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppDoc")
            .field("doc", &self.doc)
            .field("config", &self.config)
            .field("flags", &self.flags)
            .field("style_path", &self.style_path)
            .field("xsl_params", &self.xsl_params)
            .field("alt_payload", &self.alt_payload.as_ref().map(String::len))
            .finish_non_exhaustive()
    }
}

impl Deref for AppDoc {
    type Target = DomDoc;

    fn deref(&self) -> &DomDoc {
        &self.doc
    }
}

impl DerefMut for AppDoc {
    fn deref_mut(&mut self) -> &mut DomDoc {
        &mut self.doc
    }
}

impl AppDoc {
    /// A fresh response document with root element `root_name`.
    #[track_caller]
    pub fn new(root_name: &str, config: AppConfig) -> Self {
        Self::from_dom(DomDoc::new(root_name), config)
    }

    /// A response document read from a file, or parsed from XML data.
    #[track_caller]
    pub fn from_target(target: &str, config: AppConfig) -> Self {
        Self::from_dom(DomDoc::from_target(target), config)
    }

    /// Wrap an existing document and declare the XAO namespace on its root.
    #[track_caller]
    pub fn from_dom(mut doc: DomDoc, config: AppConfig) -> Self {
        if let Err(err) = doc.set_namespace_prefix(&config.namespace_prefix) {
            doc.throw(&err.to_string(), &[("code", "Config")]);
        }
        let declaration = format!("xmlns:{}", doc.namespace_prefix());
        let root = doc.root();
        if let Err(err) = doc.set_attributes(root, &[(declaration.as_str(), XAO_NAMESPACE)]) {
            doc.throw(&err.to_string(), &[("code", "Config")]);
        }
        Self {
            doc,
            config,
            flags: DebugFlags::default(),
            style_path: None,
            xsl_params: XslParams::new(),
            xslt_cache: None,
            doc_cache: None,
            cache: None,
            alt_payload: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// Flags from the current request, consulted by [`transform`](Self::transform).
    pub fn set_debug_flags(&mut self, flags: DebugFlags) {
        self.flags = flags;
    }

    /// Unwrap the document.
    pub fn into_inner(self) -> DomDoc {
        self.doc
    }

    // ---- stylesheet ----

    /// Use `path` as the stylesheet, both for server-side transformation and
    /// in the `xml-stylesheet` instruction. With `check`, a path that does
    /// not exist locally is an error.
    #[track_caller]
    pub fn set_style_pi(&mut self, path: &str, check: bool) -> Result<()> {
        if check && !Path::new(path).exists() {
            self.doc.throw(
                &format!(
                    "The stylesheet you specified: {path} does not exist. Turn off checking \
                     if the file exists remotely or you want to override checking."
                ),
                &[("code", "StylesheetNotFound")],
            );
            return Err(AppError::StylesheetNotFound(PathBuf::from(path)));
        }
        let path = path.replace('\\', "/");
        self.doc.set_stylesheet_pi(&path)?;
        self.style_path = Some(path);
        Ok(())
    }

    pub fn style_path(&self) -> Option<&str> {
        self.style_path.as_deref()
    }

    /// Set a stylesheet parameter for server-side transformation.
    pub fn set_xsl_param(&mut self, name: &str, value: &str) -> Result<()> {
        Ok(self.xsl_params.set(name, value)?)
    }

    // ---- caching ----

    /// Where to look for the cache entries named by the cache parameters.
    pub fn set_cache(&mut self, cache: Arc<dyn ResultCache>) {
        self.cache = Some(cache);
    }

    /// Cache the transformation result.
    pub fn set_xslt_cache(&mut self, params: CacheParams) {
        self.xslt_cache = Some(params);
    }

    /// Cache the serialized document.
    pub fn set_doc_cache(&mut self, params: CacheParams) {
        self.doc_cache = Some(params);
    }

    // ---- transformation ----

    /// Transform the document on the server unless the client is to do it.
    ///
    /// A transformer that cannot load its inputs makes its error the
    /// payload. A failed transformation is recorded in the document, which
    /// is then rendered with the error stylesheet when one is configured and
    /// debug mode is off. Returns whether a transformation result became the
    /// payload.
    #[track_caller]
    pub fn transform(&mut self) -> bool {
        if self.config.client_side_transform {
            debug!("transformation left to the client");
            return false;
        }
        let Some(style) = self.style_path.clone() else {
            self.doc.throw(
                "Transform: no stylesheet has been set.",
                &[("code", "Transform")],
            );
            return false;
        };

        let mut transformer = Transformer::new(XmlInput::Doc(&self.doc), XmlInput::Target(&style));
        transformer.set_processor(self.config.processor());
        transformer.set_xsl_params(self.xsl_params.clone());
        if let (Some(params), Some(cache)) = (&self.xslt_cache, &self.cache) {
            transformer.set_cache(params.clone(), Arc::clone(cache));
        }
        if let Some(message) = transformer.error() {
            self.alt_payload = Some(message.to_string());
            return false;
        }

        match transformer.transform() {
            Ok(output) => {
                let output = output.to_string();
                self.alt_payload = Some(if self.config.debug && self.flags.xsl {
                    transformer.style_source().unwrap_or(output)
                } else {
                    output
                });
                true
            }
            Err(err) => {
                self.doc.throw(&err.to_string(), &[("code", "Transform")]);
                self.render_errors();
                false
            }
        }
    }

    /// Render the document and its errors with the error stylesheet.
    fn render_errors(&mut self) {
        if self.config.debug {
            return;
        }
        let Some(style) = self.config.error_style.clone() else {
            return;
        };
        let mut transformer = Transformer::new(XmlInput::Doc(&self.doc), XmlInput::File(&style));
        transformer.set_processor(self.config.processor());
        match transformer.transform() {
            Ok(output) => self.alt_payload = Some(output.to_string()),
            Err(err) => error!(style = %style.display(), "error stylesheet failed: {err}"),
        }
    }

    // ---- output ----

    /// Replace whatever would be sent with `payload`.
    pub fn set_alt_payload(&mut self, payload: impl Into<String>) {
        self.alt_payload = Some(payload.into());
    }

    pub fn alt_payload(&self) -> Option<&str> {
        self.alt_payload.as_deref().filter(|payload| !payload.is_empty())
    }

    /// The alternate payload, or else the serialized document, served from
    /// the document cache when one is configured.
    pub fn payload(&self) -> Result<String> {
        if let Some(payload) = self.alt_payload() {
            return Ok(payload.to_string());
        }
        let cache = self.doc_cache.as_ref().zip(self.cache.as_ref());
        if let Some((params, cache)) = cache {
            if let Some(hit) = cache.get(params) {
                return Ok(hit);
            }
            let xml = self.doc.xml_doc()?;
            cache.put(params, &xml);
            return Ok(xml);
        }
        Ok(self.doc.xml_doc()?)
    }

    /// Decide what goes back to the client.
    ///
    /// In debug mode `xao:XML` sends the raw document as plain text and
    /// `xao:Text` forces plain text for whatever is sent. Otherwise the
    /// configured content type wins; an alternate payload is sniffed for an
    /// XML declaration and the document itself goes out as `text/xml`.
    pub fn send(&self, flags: &DebugFlags) -> Result<Response> {
        if self.config.debug && flags.xml {
            return Ok(Response::new("text/plain", self.doc.xml_doc()?));
        }
        let forced = if self.config.debug && flags.text {
            Some("text/plain".to_string())
        } else {
            self.config.force_content_type.clone()
        };

        let response = match self.alt_payload() {
            Some(payload) => {
                let content_type =
                    forced.unwrap_or_else(|| sniff_content_type(payload).to_string());
                Response::new(content_type, payload)
            }
            None => Response::new(forced.as_deref().unwrap_or("text/xml"), self.payload()?),
        };
        info!(
            content_type = %response.content_type,
            bytes = response.body.len(),
            "response ready"
        );
        Ok(response)
    }

    /// [`send`](Self::send) and write the response CGI style.
    pub fn send_to<W: Write>(&self, flags: &DebugFlags, out: &mut W) -> Result<()> {
        self.send(flags)?.write_cgi(out)?;
        Ok(())
    }

    // ---- errors ----

    /// Record an error in the document. A `fatal` error also ends processing:
    /// the returned [`AppError::Fatal`] carries the page to show.
    #[track_caller]
    pub fn throw(
        &mut self,
        message: &str,
        attributes: &[(&str, &str)],
        fatal: bool,
    ) -> Result<Option<Node>> {
        let node = self.doc.throw(message, attributes);
        if !fatal {
            return Ok(node);
        }
        let detail = self
            .doc
            .exceptions()
            .last()
            .map(|exception| exception.message.clone())
            .unwrap_or_else(|| message.to_string());
        error!("fatal: {detail}");
        Err(AppError::Fatal(format!("<br />\n{detail}")))
    }

    /// Record an error raised anywhere in the application, with the chain of
    /// errors that caused it.
    #[track_caller]
    pub fn trap_error(&mut self, err: &(dyn std::error::Error + 'static)) -> Option<Node> {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(&format!("\ncaused by: {cause}"));
            source = cause.source();
        }
        self.doc.throw(&message, &[("code", "Unhandled")])
    }
}
