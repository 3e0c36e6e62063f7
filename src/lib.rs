//! # vellum
//!
//! A template compiler. Templates mix literal text with directives:
//!
//! | Markers      | Directive         | Runs at      |
//! |--------------|-------------------|--------------|
//! | `<?= e ?>`   | escaped write     | render time  |
//! | `<?- e ?>`   | unescaped write   | render time  |
//! | `<? s ?>`    | control statement | render time  |
//! | `<?: s ?>`   | compiler control  | compile time |
//!
//! Directive code is [Rhai](https://rhai.rs). A template compiles to a Rhai
//! function of one record, `locals`, returning the rendered text. Compile-time
//! code runs in a restricted engine whose only capabilities are the
//! composition bindings (`include`, `template`, `embed_object`, `write`, ...).
//!
//! ```no_run
//! use vellum::{Locals, Options, TemplateCompiler};
//!
//! let compiler = TemplateCompiler::new(Options::default());
//! let template = compiler.compile("Hello <?= name ?>!")?;
//! assert_eq!(template.render(Locals::new().with("name", "World"))?, "Hello World!");
//! # Ok::<(), vellum::TemplateError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod escape;
pub mod literal;
pub mod loader;
pub mod logger;
pub mod module;
pub mod options;
pub mod parser;
pub mod sandbox;
pub mod syntax;
pub mod template;

use std::path::Path;

pub use compiler::{BodyWriter, Cache, CompilerContext, TemplateCompiler};
pub use error::{ErrorKind, SourcePosition, TemplateError};
pub use loader::{FsLoader, Loader, MemoryLoader};
pub use logger::{LogMessage, Severity};
pub use module::ModuleType;
pub use options::Options;
pub use syntax::{DirectiveKind, Markers, Syntax};
pub use template::{Locals, Template};

/// Compiles `src` with `options`.
pub fn compile(src: &str, options: &Options) -> Result<Template, TemplateError> {
    TemplateCompiler::new(options.clone()).compile(src)
}

/// Compiles the template at `path` with `options`.
pub fn compile_file(path: impl AsRef<Path>, options: &Options) -> Result<Template, TemplateError> {
    TemplateCompiler::new(options.clone()).compile_file(path)
}
