//! The transform wrapper.
//!
//! A [`Transformer`] pairs a source document with a stylesheet, each given
//! as a document, a file, a string or a target that is either. Loading never
//! fails outright: a problem is kept as the transformer's error and reported
//! when the transformation is attempted.

use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use xao_dom::{factory, DomDoc};

use crate::cache::{CacheParams, ResultCache};
use crate::error::{Result, TransformError};
use crate::params::{self, XslParams, XSLT_NAMESPACE};
use crate::traits::Stylesheet;
use crate::unified::{Backend, XsltProcessor};

/// Where a source document or stylesheet comes from.
#[derive(Debug, Clone, Copy)]
pub enum XmlInput<'a> {
    /// An existing document, which is copied
    Doc(&'a DomDoc),
    /// A file to parse
    File(&'a Path),
    /// XML data
    Data(&'a str),
    /// A file path when it names an existing file, XML data otherwise
    Target(&'a str),
}

impl XmlInput<'_> {
    /// File the input comes from, if any.
    fn path(&self) -> Option<PathBuf> {
        match self {
            Self::Doc(doc) => doc.source_path().map(Path::to_path_buf),
            Self::File(path) => Some(path.to_path_buf()),
            Self::Data(_) => None,
            Self::Target(target) => {
                factory::is_file_target(target).then(|| PathBuf::from(target))
            }
        }
    }

    #[track_caller]
    fn load(self) -> std::result::Result<DomDoc, String> {
        let doc = match self {
            Self::Doc(doc) => {
                let xml = doc.xml_frag().map_err(|e| e.to_string())?;
                let mut copy = DomDoc::from_data(&xml);
                copy.set_namespace_prefix(doc.namespace_prefix())
                    .map_err(|e| e.to_string())?;
                copy
            }
            Self::File(path) => DomDoc::from_file(path),
            Self::Data(data) => DomDoc::from_data(data),
            Self::Target(target) => DomDoc::from_target(target),
        };
        match doc.exceptions().first() {
            Some(failure) => Err(failure.message.clone()),
            None => Ok(doc),
        }
    }
}

/// Whether `style` looks like XSLT: an `xsl:stylesheet` or `xsl:transform`
/// root, or a literal result element carrying `xsl:version`.
pub fn is_stylesheet(style: &DomDoc) -> bool {
    let root = style.root();
    let xslt_root = style.namespace_uri(root) == Some(XSLT_NAMESPACE)
        && matches!(style.local_name(root), Some("stylesheet" | "transform"));
    xslt_root || style.attribute_ns(root, XSLT_NAMESPACE, "version").is_some()
}

/// A source document and a stylesheet waiting to be transformed.
pub struct Transformer {
    source: DomDoc,
    style: DomDoc,
    stylesheet_path: Option<PathBuf>,
    params: XslParams,
    params_appended: bool,
    processor: XsltProcessor,
    cache: Option<(CacheParams, Arc<dyn ResultCache>)>,
    load_failed: bool,
    error: Option<String>,
    result: Option<String>,
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("stylesheet_path", &self.stylesheet_path)
            .field("params", &self.params)
            .field("backend", &self.processor.backend())
            .field("cache", &self.cache.as_ref().map(|(params, _)| params))
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Transformer {
    /// Load the source and the stylesheet.
    #[track_caller]
    pub fn new(source: XmlInput<'_>, style: XmlInput<'_>) -> Self {
        let location = Location::caller();
        let stylesheet_path = style.path();
        let mut errors = Vec::new();

        let source = source.load().unwrap_or_else(|message| {
            errors.push(format!("Transformer: could not load the source document: {message}"));
            DomDoc::new("root")
        });
        let style = style.load().unwrap_or_else(|message| {
            errors.push(format!("Transformer: could not load the stylesheet: {message}"));
            DomDoc::new("root")
        });

        let error = (!errors.is_empty()).then(|| errors.join("\n\n"));
        if let Some(message) = &error {
            warn!(caller = %location, "{message}");
        } else {
            debug!(stylesheet = ?stylesheet_path, "transformer ready");
        }

        Self {
            source,
            style,
            stylesheet_path,
            params: XslParams::new(),
            params_appended: false,
            processor: XsltProcessor::default(),
            cache: None,
            load_failed: error.is_some(),
            error,
            result: None,
        }
    }

    /// The most recent problem: a load failure or a failed transformation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The source document as the stylesheet will see it.
    pub fn source(&self) -> &DomDoc {
        &self.source
    }

    pub fn style(&self) -> &DomDoc {
        &self.style
    }

    /// File the stylesheet was read from.
    pub fn stylesheet_path(&self) -> Option<&Path> {
        self.stylesheet_path.as_deref()
    }

    pub fn params(&self) -> &XslParams {
        &self.params
    }

    /// Set a stylesheet parameter. The name must be a safe name.
    pub fn set_xsl_param(&mut self, name: &str, value: &str) -> Result<()> {
        self.params.set(name, value)
    }

    /// Replace every stylesheet parameter.
    pub fn set_xsl_params(&mut self, params: XslParams) {
        self.params = params;
    }

    pub fn backend(&self) -> Backend {
        self.processor.backend()
    }

    pub fn set_backend(&mut self, backend: Backend) {
        self.processor = XsltProcessor::with_backend(backend);
    }

    /// Use a configured processor, such as xsltproc at a specific path.
    pub fn set_processor(&mut self, processor: XsltProcessor) {
        self.processor = processor;
    }

    /// Prefix for the parameter elements added to the source.
    pub fn set_namespace_prefix(&mut self, prefix: &str) -> Result<()> {
        Ok(self.source.set_namespace_prefix(prefix)?)
    }

    /// Consult `cache` before transforming and store fresh results in it.
    pub fn set_cache(&mut self, params: CacheParams, cache: Arc<dyn ResultCache>) {
        self.cache = Some((params, cache));
    }

    /// The serialized stylesheet.
    pub fn style_source(&self) -> Result<String> {
        Ok(self.style.xml_doc()?)
    }

    /// Run the transformation and return its output, also kept in
    /// [`result`](Self::result).
    ///
    /// Parameters are appended to the source as an `xslParams` element
    /// before the cache or the backend is consulted.
    pub fn transform(&mut self) -> Result<&str> {
        if self.load_failed {
            let message = self.error.clone().unwrap_or_default();
            return Err(TransformError::Construction(message));
        }
        if !is_stylesheet(&self.style) {
            let name = match &self.stylesheet_path {
                Some(path) => path.display().to_string(),
                None => "The stylesheet".to_string(),
            };
            return Err(self.fail(TransformError::NotAStylesheet(name)));
        }
        if !self.params_appended {
            params::append_to_source(&mut self.source, &self.params)?;
            self.params_appended = true;
        }

        if let Some((params, cache)) = &self.cache {
            if let Some(hit) = cache.get(params) {
                debug!(key = %params.key, "transformation served from cache");
                return Ok(self.result.insert(hit).as_str());
            }
        }

        let source = self.source.xml_doc()?;
        let style = self.style.xml_doc()?;
        let stylesheet = Stylesheet::new(&style).with_path(self.stylesheet_path.as_deref());
        match self.processor.transform(&source, stylesheet, &self.params) {
            Ok(output) => {
                info!(
                    backend = self.processor.name(),
                    bytes = output.len(),
                    "transformation complete"
                );
                if let Some((params, cache)) = &self.cache {
                    cache.put(params, &output);
                }
                self.error = None;
                Ok(self.result.insert(output).as_str())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Output of the last successful transformation.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    fn fail(&mut self, err: TransformError) -> TransformError {
        let stylesheet = self
            .stylesheet_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        warn!(backend = self.processor.name(), stylesheet = %stylesheet, "{err}");
        self.error = Some(err.to_string());
        err
    }
}
