use std::{
    error, fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::syntax::DirectiveKind;

/// The family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed or unterminated directive markers in template source.
    Syntax,
    /// Missing or invalid options, e.g. a relative include without a filename.
    Configuration,
    /// An include or data file could not be found or read.
    Resolution,
    /// A failure raised while running compiler-program or render-time code.
    Evaluation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Evaluation => "evaluation",
        };
        f.write_str(name)
    }
}

/// A location inside template source. Lines and columns start at 1, columns count characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    /// Computes line and column of the byte `offset` in `src`.
    pub fn locate(src: &str, offset: usize) -> Self {
        let offset = offset.min(src.len());
        let before = src.get(..offset).unwrap_or(src);
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit('\n')
            .next()
            .map(|current| current.chars().count())
            .unwrap_or_default()
            + 1;
        SourcePosition {
            offset,
            line,
            column,
        }
    }
}

/// Represents an error raised while compiling or rendering a template.
///
/// Errors are cheap to clone so a failed compilation stored in a
/// [`Cache`](crate::compiler::Cache) can be handed to every include that
/// asks for the same file.
#[derive(Debug, Clone)]
pub struct TemplateError {
    /// What went wrong, broadly.
    pub kind: ErrorKind,
    /// A detailed message describing the error.
    pub info: String,
    /// The template file being compiled when the error occurred, if known.
    pub file: Option<PathBuf>,
    /// The kind of directive the error points at, if any.
    pub directive: Option<DirectiveKind>,
    /// Where in the template source the error points, if known.
    pub position: Option<SourcePosition>,
    cause: Option<Arc<dyn error::Error + Send + Sync>>,
}

impl TemplateError {
    pub fn new<S: ToString>(kind: ErrorKind, info: S) -> Self {
        TemplateError {
            kind,
            info: info.to_string(),
            file: None,
            directive: None,
            position: None,
            cause: None,
        }
    }

    pub fn syntax<S: ToString>(info: S) -> Self {
        Self::new(ErrorKind::Syntax, info)
    }

    pub fn configuration<S: ToString>(info: S) -> Self {
        Self::new(ErrorKind::Configuration, info)
    }

    pub fn resolution<S: ToString>(info: S) -> Self {
        Self::new(ErrorKind::Resolution, info)
    }

    pub fn evaluation<S: ToString>(info: S) -> Self {
        Self::new(ErrorKind::Evaluation, info)
    }

    /// Attaches the originating file, unless a more precise one is already known.
    pub fn in_file(mut self, file: &Path) -> Self {
        if self.file.is_none() {
            self.file = Some(file.to_path_buf());
        }
        self
    }

    /// Same as [`in_file`](Self::in_file) for an optional path.
    pub fn in_file_opt(self, file: Option<&Path>) -> Self {
        match file {
            Some(file) => self.in_file(file),
            None => self,
        }
    }

    /// Points the error at a directive.
    pub fn at(mut self, directive: DirectiveKind, position: SourcePosition) -> Self {
        self.directive = Some(directive);
        self.position = Some(position);
        self
    }

    /// Keeps `cause` as the underlying error, reachable through [`error::Error::source`].
    pub fn caused_by<E>(mut self, cause: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error", self.kind)?;
        if let Some(file) = &self.file {
            write!(f, " in {}", file.display())?;
        }
        match (self.directive, self.position) {
            (Some(directive), Some(pos)) => write!(
                f,
                " ({directive} directive at line {}, column {})",
                pos.line, pos.column
            )?,
            (Some(directive), None) => write!(f, " ({directive} directive)")?,
            (None, Some(pos)) => write!(f, " (line {}, column {})", pos.line, pos.column)?,
            (None, None) => (),
        }
        write!(f, ": {}", self.info)
    }
}

impl error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn error::Error + 'static))
    }
}

/// Converts an I/O error into a resolution failure, keeping the original as its cause.
impl From<io::Error> for TemplateError {
    fn from(err: io::Error) -> Self {
        TemplateError::resolution(err.to_string()).caused_by(err)
    }
}

/// Converts a Serde JSON error into an evaluation failure.
impl From<serde_json::Error> for TemplateError {
    fn from(err: serde_json::Error) -> Self {
        TemplateError::evaluation(format!("invalid JSON: {err}")).caused_by(err)
    }
}

/// Converts a Rhai parse error. Rhai errors are not thread-safe, so only the message is kept.
impl From<rhai::ParseError> for TemplateError {
    fn from(err: rhai::ParseError) -> Self {
        TemplateError::evaluation(err.to_string())
    }
}

/// Converts a Rhai runtime error. Rhai errors are not thread-safe, so only the message is kept.
impl From<Box<rhai::EvalAltResult>> for TemplateError {
    fn from(err: Box<rhai::EvalAltResult>) -> Self {
        TemplateError::evaluation(err.to_string())
    }
}
