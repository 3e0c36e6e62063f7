use crate::compiler::fragments::FragmentTable;
use crate::escape::quote;
use crate::parser::Visitor;
use crate::sandbox::{ESCAPE_FN, OUTPUT_VAR};

/// A compiler program ready to run, with the fragments it refers to.
#[derive(Debug, Clone)]
pub struct CompilerProgram {
    pub source: String,
    pub fragments: FragmentTable,
    /// First program line of each statement, with the template offset of the
    /// compiler-control directive it came from.
    origins: Vec<(usize, Option<usize>)>,
}

impl CompilerProgram {
    /// Template offset of the compiler-control directive that produced `line`
    /// of the program, if that line came from one.
    pub fn origin_of(&self, line: usize) -> Option<usize> {
        self.origins
            .iter()
            .take_while(|(start, _)| *start <= line)
            .last()
            .and_then(|(_, offset)| *offset)
    }
}

/// Turns parse events into a compiler program.
///
/// Literal text and write directives are buffered; the buffer becomes a
/// single `__r += ...;` fragment when a statement directive or the end of
/// the input is reached.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    source: String,
    next_line: usize,
    origins: Vec<(usize, Option<usize>)>,
    pending: Vec<String>,
    fragments: FragmentTable,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            next_line: 1,
            ..Default::default()
        }
    }

    fn statement(&mut self, code: &str, origin: Option<usize>) {
        self.origins.push((self.next_line, origin));
        self.source.push_str(code);
        self.source.push_str(";\n");
        self.next_line += code.matches('\n').count() + 1;
    }

    fn write_fragment(&mut self, code: String) {
        let index = self.fragments.push(code);
        self.statement(&FragmentTable::write_statement(index), None);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let parts = std::mem::take(&mut self.pending);
        self.write_fragment(format!("{OUTPUT_VAR} += {};", parts.join(" + ")));
    }

    pub fn finish(mut self) -> CompilerProgram {
        self.flush();
        CompilerProgram {
            source: self.source,
            fragments: self.fragments,
            origins: self.origins,
        }
    }
}

impl Visitor for ProgramBuilder {
    fn plain(&mut self, text: &str, _offset: usize) {
        self.pending.push(quote(text));
    }

    fn compiler_control(&mut self, code: &str, offset: usize) {
        self.flush();
        self.statement(code, Some(offset));
    }

    fn write_escaped(&mut self, code: &str, _offset: usize) {
        self.pending.push(format!("{ESCAPE_FN}({code})"));
    }

    fn write_unescaped(&mut self, code: &str, _offset: usize) {
        self.pending.push(format!("to_string({code})"));
    }

    fn control(&mut self, code: &str, _offset: usize) {
        self.flush();
        self.write_fragment(format!("{code};\n"));
    }
}
