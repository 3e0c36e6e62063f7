//! Turns template source into artifact source.
//!
//! Compilation happens in two steps. The template is first parsed into a
//! *compiler program*: Rhai code that, when run, assembles the body of the
//! artifact. Literal text and render-time directives reach the artifact
//! through the [`FragmentTable`](fragments::FragmentTable); compiler-control
//! directives are part of the program itself and may call the composition
//! bindings of [`context`] to include other templates, declare nested
//! templates or embed compile-time data.
//!
//! The program is then run once in a restricted [`Sandbox`]. Whatever it
//! wrote, wrapped in the artifact header and footer, is the artifact source,
//! which [`Template::load`] turns into a callable.

use std::path::{Path, PathBuf};

use rhai::EvalAltResult;

use crate::error::{SourcePosition, TemplateError};
use crate::loader;
use crate::log_debug;
use crate::module::build_module;
use crate::options::Options;
use crate::parser;
use crate::sandbox::{LOCALS, OUTPUT_VAR, Sandbox};
use crate::syntax::DirectiveKind;
use crate::template::Template;

mod cache;
pub use cache::{Cache, CompilationState};

pub mod context;
pub use context::{BodyWriter, CompilerContext};

pub mod fragments;

mod program;
pub use program::{CompilerProgram, ProgramBuilder};

#[cfg(test)]
mod tests;

/// Marks the header of an asynchronous artifact.
pub const ASYNC_MARKER: &str = "/* async */ ";

/// Closes an artifact opened by [`header`].
pub const FOOTER: &str = "__r }";

/// Opens an artifact: a function of `locals` with an empty output accumulator.
pub fn header(is_async: bool) -> String {
    let marker = if is_async { ASYNC_MARKER } else { "" };
    format!("{marker}|{LOCALS}| {{ let {OUTPUT_VAR} = \"\";")
}

/// Compiles template source into artifact source.
pub fn compile_code(src: &str, options: &Options) -> Result<String, TemplateError> {
    let file = options.filename.as_deref();
    log_debug!(
        "compiling {}",
        file.map(|f| f.display().to_string())
            .unwrap_or_else(|| "inline template".to_string())
    );

    let mut builder = ProgramBuilder::new();
    parser::parse(src, &options.syntax, &mut builder).map_err(|err| err.in_file_opt(file))?;
    let program = builder.finish();

    let writer = BodyWriter::new();
    let mut sandbox = Sandbox::compiler();
    context::install(&mut sandbox, program.fragments.clone(), options, &writer);
    if let Some(extend) = &options.extend {
        let mut context = CompilerContext::new(&mut sandbox, writer.clone(), options);
        extend(&mut context).map_err(|err| err.in_file_opt(file))?;
    }

    if let Err(err) = sandbox.run(&program.source) {
        return Err(program_failure(src, &program, &writer, *err).in_file_opt(file));
    }

    let code = format!("{}{}{FOOTER}", header(options.is_async), writer.body());
    log_debug!("compiled {} fragments into {} bytes", program.fragments.len(), code.len());
    Ok(code)
}

/// The error a failed compiler program stands for, pointed at the
/// compiler-control directive it was raised from when that is known.
fn program_failure(
    src: &str,
    program: &CompilerProgram,
    writer: &BodyWriter,
    mut err: EvalAltResult,
) -> TemplateError {
    let origin = err
        .take_position()
        .line()
        .and_then(|line| program.origin_of(line));
    let error = writer
        .take_failure()
        .unwrap_or_else(|| TemplateError::evaluation(err.to_string()));
    match origin {
        Some(offset) if error.position.is_none() => error.at(
            DirectiveKind::CompilerControl,
            SourcePosition::locate(src, offset),
        ),
        _ => error,
    }
}

/// Compiles the template at `path`, through `options.cache` when there is one.
pub(crate) fn compile_code_from_file(path: &Path, options: &Options) -> Result<String, TemplateError> {
    let path = loader::normalize(path);
    if options.chain.contains(&path) {
        return Err(TemplateError::resolution(format!(
            "circular include of {}",
            path.display()
        )));
    }
    match &options.cache {
        Some(cache) => cache
            .get_or_compile(&path, || read_and_compile(&path, options))
            .map(|code| code.to_string()),
        None => read_and_compile(&path, options),
    }
}

fn read_and_compile(path: &Path, options: &Options) -> Result<String, TemplateError> {
    let encoding = loader::resolve_encoding(options.encoding.as_deref())?;
    let src = options.loader.load(path, encoding)?;
    let mut file_options = options.clone();
    file_options.filename = Some(path.to_path_buf());
    file_options.chain.push(path.to_path_buf());
    compile_code(&src, &file_options)
}

async fn compile_blocking<F>(job: F) -> Result<String, TemplateError>
where
    F: FnOnce() -> Result<String, TemplateError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| TemplateError::evaluation(format!("compilation task failed: {err}")))?
}

/// Entry point for compiling templates with a fixed set of [`Options`].
#[derive(Debug, Clone, Default)]
pub struct TemplateCompiler {
    options: Options,
}

impl TemplateCompiler {
    pub fn new(options: Options) -> Self {
        TemplateCompiler { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Artifact source for `src`.
    pub fn code(&self, src: &str) -> Result<String, TemplateError> {
        compile_code(src, &self.options)
    }

    /// Artifact source for the template at `path`. `path` replaces the configured filename.
    pub fn file_to_code(&self, path: impl AsRef<Path>) -> Result<String, TemplateError> {
        compile_code_from_file(path.as_ref(), &self.options)
    }

    pub fn compile(&self, src: &str) -> Result<Template, TemplateError> {
        Template::load(self.code(src)?, self.options.is_async)
    }

    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Template, TemplateError> {
        Template::load(self.file_to_code(path)?, self.options.is_async)
    }

    /// Module text exporting the compiled `src` as `template`.
    pub fn to_module(&self, src: &str) -> Result<String, TemplateError> {
        Ok(build_module(&self.code(src)?, self.options.module_type))
    }

    pub fn file_to_module(&self, path: impl AsRef<Path>) -> Result<String, TemplateError> {
        Ok(build_module(&self.file_to_code(path)?, self.options.module_type))
    }

    /// Same as [`compile`](Self::compile), run on tokio's blocking pool.
    pub async fn compile_async(&self, src: impl Into<String>) -> Result<Template, TemplateError> {
        let (src, options) = (src.into(), self.options.clone());
        let code = compile_blocking(move || compile_code(&src, &options)).await?;
        Template::load(code, self.options.is_async)
    }

    /// Same as [`compile_file`](Self::compile_file), run on tokio's blocking pool.
    pub async fn compile_file_async(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<Template, TemplateError> {
        let (path, options) = (path.into(), self.options.clone());
        let code = compile_blocking(move || compile_code_from_file(&path, &options)).await?;
        Template::load(code, self.options.is_async)
    }
}
