use crate::error::TemplateError;
use crate::parser::{Event, Parser, Visitor, parse};
use crate::syntax::Syntax;

mod errors;
mod visitor;

pub fn events(src: &str) -> Vec<(usize, Event<'_>)> {
    events_with(src, &Syntax::default()).expect("parse failed")
}

pub fn events_with<'a>(
    src: &'a str,
    syntax: &Syntax,
) -> Result<Vec<(usize, Event<'a>)>, TemplateError> {
    Parser::new(src, syntax).collect()
}

/// Records every callback as `kind:text@offset`.
#[derive(Default)]
pub struct Recorder {
    pub calls: Vec<String>,
}

impl Visitor for Recorder {
    fn plain(&mut self, text: &str, offset: usize) {
        self.calls.push(format!("plain:{text}@{offset}"));
    }

    fn compiler_control(&mut self, code: &str, offset: usize) {
        self.calls.push(format!("compiler_control:{code}@{offset}"));
    }

    fn write_escaped(&mut self, code: &str, offset: usize) {
        self.calls.push(format!("write_escaped:{code}@{offset}"));
    }

    fn write_unescaped(&mut self, code: &str, offset: usize) {
        self.calls.push(format!("write_unescaped:{code}@{offset}"));
    }

    fn control(&mut self, code: &str, offset: usize) {
        self.calls.push(format!("control:{code}@{offset}"));
    }
}

pub fn record(src: &str, syntax: &Syntax) -> Result<Vec<String>, TemplateError> {
    let mut recorder = Recorder::default();
    parse(src, syntax, &mut recorder)?;
    Ok(recorder.calls)
}
