use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::{Locals, MemoryLoader, Options, Template, TemplateCompiler};

mod asynchronous;
mod errors;
mod scenarios;

pub fn compile_with(src: &str, options: Options) -> Template {
    TemplateCompiler::new(options)
        .compile(src)
        .unwrap_or_else(|e| panic!("compilation failed: {e}"))
}

pub fn compile(src: &str) -> Template {
    compile_with(src, Options::default())
}

pub fn render_with(src: &str, options: Options, locals: Locals) -> String {
    compile_with(src, options)
        .render(locals)
        .unwrap_or_else(|e| panic!("render failed: {e}"))
}

pub fn render(src: &str, locals: Locals) -> String {
    render_with(src, Options::default(), locals)
}

/// Writes `files` under `dir`, creating directories as needed.
pub fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&path, content).expect("Failed to write template");
    }
}

pub fn memory(files: &[(&str, &str)]) -> Arc<MemoryLoader> {
    let mut loader = MemoryLoader::new();
    for (path, content) in files {
        loader.insert(*path, *content);
    }
    Arc::new(loader)
}
