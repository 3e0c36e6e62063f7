//! Template source loading and include path resolution.

use std::{
    collections::HashMap,
    fmt,
    path::{Component, Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use encoding_rs::{Encoding, UTF_8};

use crate::error::TemplateError;
use crate::log_warn;

/// Reads template sources. Implementations must be shareable across threads
/// since a [`Cache`](crate::compiler::Cache) may be.
pub trait Loader: fmt::Debug + Send + Sync {
    fn load(&self, path: &Path, encoding: &'static Encoding) -> Result<String, TemplateError>;
}

/// Reads sources from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl Loader for FsLoader {
    fn load(&self, path: &Path, encoding: &'static Encoding) -> Result<String, TemplateError> {
        let bytes = std::fs::read(path).map_err(|err| TemplateError::from(err).in_file(path))?;
        let (text, _, malformed) = encoding.decode(&bytes);
        if malformed {
            log_warn!(
                "{} is not valid {}, invalid sequences were replaced",
                path.display(),
                encoding.name()
            );
        }
        Ok(text.into_owned())
    }
}

/// Serves sources from memory and counts reads. Encodings are ignored.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
    reads: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    /// How many times [`Loader::load`] was called.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Loader for MemoryLoader {
    fn load(&self, path: &Path, _encoding: &'static Encoding) -> Result<String, TemplateError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files.get(path).cloned().ok_or_else(|| {
            TemplateError::resolution(format!("no template registered at {}", path.display()))
                .in_file(path)
        })
    }
}

/// Looks up a WHATWG encoding label. `None` means UTF-8.
pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, TemplateError> {
    match label {
        None => Ok(UTF_8),
        Some(label) => Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            TemplateError::configuration(format!("unknown encoding `{label}`"))
        }),
    }
}

/// Resolves an include request against the file that asked for it.
///
/// Absolute requests are used as they are. Relative ones are joined to the
/// directory of `origin`, which must then be known.
pub fn resolve(request: &str, origin: Option<&Path>) -> Result<PathBuf, TemplateError> {
    let requested = Path::new(request);
    if requested.is_absolute() {
        return Ok(normalize(requested));
    }
    let origin = origin.ok_or_else(|| {
        TemplateError::configuration(format!(
            "cannot resolve relative path `{request}` without a filename"
        ))
    })?;
    let base = origin.parent().unwrap_or_else(|| Path::new(""));
    Ok(normalize(&base.join(requested)))
}

/// Lexically removes `.` and `..` components, without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
