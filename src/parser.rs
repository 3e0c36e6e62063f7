//! Streaming directive parser.
//!
//! Splits template source into an ordered sequence of [`Event`]s, one per
//! literal run or directive. Directive contents are never inspected.
//!
//! At any position, the open marker occurring first wins. When several open
//! markers start at the same position, the longest one wins, which is how
//! `<?=` is told apart from `<?`.

use crate::error::{SourcePosition, TemplateError};
use crate::syntax::{DirectiveKind, Syntax};

#[cfg(test)]
mod tests;

/// One span of template source, borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Plain(&'a str),
    CompilerControl(&'a str),
    WriteEscaped(&'a str),
    WriteUnescaped(&'a str),
    Control(&'a str),
}

impl<'a> Event<'a> {
    pub fn new(kind: DirectiveKind, text: &'a str) -> Self {
        match kind {
            DirectiveKind::Plain => Event::Plain(text),
            DirectiveKind::CompilerControl => Event::CompilerControl(text),
            DirectiveKind::WriteEscaped => Event::WriteEscaped(text),
            DirectiveKind::WriteUnescaped => Event::WriteUnescaped(text),
            DirectiveKind::Control => Event::Control(text),
        }
    }

    pub fn kind(&self) -> DirectiveKind {
        match self {
            Event::Plain(_) => DirectiveKind::Plain,
            Event::CompilerControl(_) => DirectiveKind::CompilerControl,
            Event::WriteEscaped(_) => DirectiveKind::WriteEscaped,
            Event::WriteUnescaped(_) => DirectiveKind::WriteUnescaped,
            Event::Control(_) => DirectiveKind::Control,
        }
    }

    pub fn text(&self) -> &'a str {
        match self {
            Event::Plain(text)
            | Event::CompilerControl(text)
            | Event::WriteEscaped(text)
            | Event::WriteUnescaped(text)
            | Event::Control(text) => text,
        }
    }
}

/// Receives parse events in source order, with the byte offset each span starts at.
pub trait Visitor {
    fn plain(&mut self, text: &str, offset: usize);
    fn compiler_control(&mut self, code: &str, offset: usize);
    fn write_escaped(&mut self, code: &str, offset: usize);
    fn write_unescaped(&mut self, code: &str, offset: usize);
    fn control(&mut self, code: &str, offset: usize);
}

/// Lazy iterator over the events of a template source.
///
/// Yields `(offset, event)` pairs. An unterminated directive yields one
/// syntax error, after which the iterator is exhausted. Events borrow from
/// the source only, not from the syntax table.
pub struct Parser<'s, 'y> {
    src: &'s str,
    markers: Vec<(DirectiveKind, &'y str, &'y str)>,
    pos: usize,
    finished: bool,
}

impl<'s, 'y> Parser<'s, 'y> {
    /// Empty markers are skipped here; [`Syntax::validate`] reports them.
    pub fn new(src: &'s str, syntax: &'y Syntax) -> Self {
        let markers = syntax
            .directives()
            .filter(|(_, markers)| !markers.is_empty())
            .map(|(kind, markers)| (kind, markers.open.as_str(), markers.close.as_str()))
            .collect();
        Parser {
            src,
            markers,
            pos: 0,
            finished: false,
        }
    }

    /// Earliest open marker in `rest`, longest first on ties.
    fn next_open(&self, rest: &str) -> Option<(usize, DirectiveKind, &'y str, &'y str)> {
        let mut best: Option<(usize, DirectiveKind, &'y str, &'y str)> = None;
        for &(kind, open, close) in &self.markers {
            let Some(index) = rest.find(open) else {
                continue;
            };
            let better = match best {
                None => true,
                Some((best_index, _, best_open, _)) => {
                    index < best_index || (index == best_index && open.len() > best_open.len())
                }
            };
            if better {
                best = Some((index, kind, open, close));
            }
        }
        best
    }
}

impl<'s> Iterator for Parser<'s, '_> {
    type Item = Result<(usize, Event<'s>), TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.pos >= self.src.len() {
            self.finished = true;
            return None;
        }
        let start = self.pos;
        let rest = &self.src[start..];

        match self.next_open(rest) {
            None => {
                self.pos = self.src.len();
                Some(Ok((start, Event::Plain(rest))))
            }
            Some((0, kind, open, close)) => {
                let body = start + open.len();
                match self.src[body..].find(close) {
                    Some(length) => {
                        self.pos = body + length + close.len();
                        Some(Ok((start, Event::new(kind, &self.src[body..body + length]))))
                    }
                    None => {
                        self.finished = true;
                        let error = TemplateError::syntax(format!(
                            "unterminated directive: `{open}` is never closed by `{close}`"
                        ))
                        .at(kind, SourcePosition::locate(self.src, start));
                        Some(Err(error))
                    }
                }
            }
            Some((index, ..)) => {
                self.pos = start + index;
                Some(Ok((start, Event::Plain(&rest[..index]))))
            }
        }
    }
}

impl std::iter::FusedIterator for Parser<'_, '_> {}

/// Parses `src` and drives `visitor` with every event, stopping at the first error.
pub fn parse(src: &str, syntax: &Syntax, visitor: &mut impl Visitor) -> Result<(), TemplateError> {
    syntax.validate()?;
    for item in Parser::new(src, syntax) {
        let (offset, event) = item?;
        match event {
            Event::Plain(text) => visitor.plain(text, offset),
            Event::CompilerControl(code) => visitor.compiler_control(code, offset),
            Event::WriteEscaped(code) => visitor.write_escaped(code, offset),
            Event::WriteUnescaped(code) => visitor.write_unescaped(code, offset),
            Event::Control(code) => visitor.control(code, offset),
        }
    }
    Ok(())
}
