use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use rhai::{Array, Dynamic, ImmutableString, Map};

use crate::compiler::{Cache, CompilerContext};
use crate::error::TemplateError;
use crate::loader::{FsLoader, Loader};
use crate::module::ModuleType;
use crate::syntax::{DirectiveKind, Markers, Syntax};

/// Host hook run once per compilation, before the compiler program starts.
pub type Extension = Arc<dyn Fn(&mut CompilerContext<'_>) -> Result<(), TemplateError> + Send + Sync>;

/// Settings for one compilation.
///
/// Includes inherit `syntax`, `extend`, `encoding`, `cache` and `loader` from
/// the template that asks for them; `filename` becomes the included file and
/// `is_async` is reset unless an override sets it.
#[derive(Clone)]
pub struct Options {
    pub syntax: Syntax,
    /// Path of the template being compiled, used to resolve relative includes.
    pub filename: Option<PathBuf>,
    /// WHATWG label of the source encoding. `None` means UTF-8.
    pub encoding: Option<String>,
    /// Generate an asynchronous artifact.
    pub is_async: bool,
    pub extend: Option<Extension>,
    pub cache: Option<Cache>,
    pub module_type: ModuleType,
    pub loader: Arc<dyn Loader>,
    /// Files currently being compiled, outermost first.
    pub(crate) chain: Vec<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            syntax: Syntax::default(),
            filename: None,
            encoding: None,
            is_async: false,
            extend: None,
            cache: None,
            module_type: ModuleType::default(),
            loader: Arc::new(FsLoader),
            chain: Vec::new(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("syntax", &self.syntax)
            .field("filename", &self.filename)
            .field("encoding", &self.encoding)
            .field("is_async", &self.is_async)
            .field("extend", &self.extend.as_ref().map(|_| "<extension>"))
            .field("cache", &self.cache)
            .field("module_type", &self.module_type)
            .field("loader", &self.loader)
            .finish()
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn with_extension<F>(mut self, extend: F) -> Self
    where
        F: Fn(&mut CompilerContext<'_>) -> Result<(), TemplateError> + Send + Sync + 'static,
    {
        self.extend = Some(Arc::new(extend));
        self
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_module_type(mut self, module_type: ModuleType) -> Self {
        self.module_type = module_type;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = loader;
        self
    }

    /// Directory of `filename`.
    pub fn dirname(&self) -> Option<&Path> {
        self.filename.as_deref().and_then(Path::parent)
    }

    /// Options an include starts from, before overrides.
    pub(crate) fn for_include(&self) -> Options {
        Options {
            syntax: self.syntax.clone(),
            filename: None,
            encoding: self.encoding.clone(),
            is_async: false,
            extend: self.extend.clone(),
            cache: self.cache.clone(),
            module_type: self.module_type,
            loader: self.loader.clone(),
            chain: self.chain.clone(),
        }
    }

    /// Applies an include's overrides map: `async`, `encoding` and `syntax`.
    pub(crate) fn apply_overrides(&mut self, overrides: &Map) -> Result<(), TemplateError> {
        for (key, value) in overrides {
            match key.as_str() {
                "async" => {
                    self.is_async = value.as_bool().map_err(|_| {
                        TemplateError::configuration("the `async` override must be a boolean")
                    })?;
                }
                "encoding" => {
                    let label = value.clone().try_cast::<ImmutableString>().ok_or_else(|| {
                        TemplateError::configuration("the `encoding` override must be a string")
                    })?;
                    self.encoding = Some(label.to_string());
                }
                "syntax" => {
                    let table = value.clone().try_cast::<Map>().ok_or_else(|| {
                        TemplateError::configuration(
                            "the `syntax` override must map directive kinds to [open, close]",
                        )
                    })?;
                    for (kind, markers) in &table {
                        let kind: DirectiveKind = kind.parse()?;
                        self.syntax.set_markers(kind, markers_from(kind, markers)?);
                    }
                }
                other => {
                    return Err(TemplateError::configuration(format!(
                        "unknown include option `{other}`"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn markers_from(kind: DirectiveKind, value: &Dynamic) -> Result<Markers, TemplateError> {
    let invalid = || {
        TemplateError::configuration(format!(
            "markers for {kind} directives must be a pair of strings"
        ))
    };
    let pair = value.clone().try_cast::<Array>().ok_or_else(invalid)?;
    match pair.as_slice() {
        [open, close] => {
            let open = open.clone().try_cast::<ImmutableString>().ok_or_else(invalid)?;
            let close = close.clone().try_cast::<ImmutableString>().ok_or_else(invalid)?;
            Ok(Markers::new(open.as_str(), close.as_str()))
        }
        _ => Err(invalid()),
    }
}
