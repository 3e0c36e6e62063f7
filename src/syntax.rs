//! Directive kinds and the marker table that delimits them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// The five kinds of spans a template is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    /// Literal text, copied to the output.
    Plain,
    /// A statement run once, at compile time.
    CompilerControl,
    /// An expression whose value is HTML-escaped into the output.
    WriteEscaped,
    /// An expression whose value is written to the output as is.
    WriteUnescaped,
    /// A statement run on every render.
    Control,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 5] = [
        DirectiveKind::Plain,
        DirectiveKind::CompilerControl,
        DirectiveKind::WriteEscaped,
        DirectiveKind::WriteUnescaped,
        DirectiveKind::Control,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DirectiveKind::Plain => "plain",
            DirectiveKind::CompilerControl => "compiler_control",
            DirectiveKind::WriteEscaped => "write_escaped",
            DirectiveKind::WriteUnescaped => "write_unescaped",
            DirectiveKind::Control => "control",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DirectiveKind {
    type Err = TemplateError;

    /// Accepts both `snake_case` and `camelCase` names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(DirectiveKind::Plain),
            "compiler_control" | "compilerControl" => Ok(DirectiveKind::CompilerControl),
            "write_escaped" | "writeEscaped" => Ok(DirectiveKind::WriteEscaped),
            "write_unescaped" | "writeUnescaped" => Ok(DirectiveKind::WriteUnescaped),
            "control" => Ok(DirectiveKind::Control),
            other => Err(TemplateError::configuration(format!(
                "unknown directive kind `{other}`"
            ))),
        }
    }
}

/// An open/close marker pair. Serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Markers {
    pub open: String,
    pub close: String,
}

impl Markers {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Markers {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty() || self.close.is_empty()
    }
}

impl From<(String, String)> for Markers {
    fn from((open, close): (String, String)) -> Self {
        Markers { open, close }
    }
}

impl From<Markers> for (String, String) {
    fn from(markers: Markers) -> Self {
        (markers.open, markers.close)
    }
}

/// Which markers delimit each directive kind.
///
/// Plain text needs no markers: anything outside a directive is plain. A
/// `plain` pair may still be configured to mark verbatim regions whose
/// content is never scanned for other directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syntax {
    pub plain: Option<Markers>,
    pub compiler_control: Markers,
    pub write_escaped: Markers,
    pub write_unescaped: Markers,
    pub control: Markers,
}

impl Default for Syntax {
    fn default() -> Self {
        Syntax {
            plain: None,
            compiler_control: Markers::new("<?:", "?>"),
            write_escaped: Markers::new("<?=", "?>"),
            write_unescaped: Markers::new("<?-", "?>"),
            control: Markers::new("<?", "?>"),
        }
    }
}

impl Syntax {
    pub fn markers(&self, kind: DirectiveKind) -> Option<&Markers> {
        match kind {
            DirectiveKind::Plain => self.plain.as_ref(),
            DirectiveKind::CompilerControl => Some(&self.compiler_control),
            DirectiveKind::WriteEscaped => Some(&self.write_escaped),
            DirectiveKind::WriteUnescaped => Some(&self.write_unescaped),
            DirectiveKind::Control => Some(&self.control),
        }
    }

    pub fn set_markers(&mut self, kind: DirectiveKind, markers: Markers) {
        match kind {
            DirectiveKind::Plain => self.plain = Some(markers),
            DirectiveKind::CompilerControl => self.compiler_control = markers,
            DirectiveKind::WriteEscaped => self.write_escaped = markers,
            DirectiveKind::WriteUnescaped => self.write_unescaped = markers,
            DirectiveKind::Control => self.control = markers,
        }
    }

    pub fn with_markers(
        mut self,
        kind: DirectiveKind,
        open: impl Into<String>,
        close: impl Into<String>,
    ) -> Self {
        self.set_markers(kind, Markers::new(open, close));
        self
    }

    /// Every configured kind with its markers.
    pub fn directives(&self) -> impl Iterator<Item = (DirectiveKind, &Markers)> {
        DirectiveKind::ALL
            .into_iter()
            .filter_map(|kind| self.markers(kind).map(|markers| (kind, markers)))
    }

    /// Rejects empty markers and open markers shared by two kinds.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut seen: Vec<(DirectiveKind, &str)> = Vec::new();
        for (kind, markers) in self.directives() {
            if markers.is_empty() {
                return Err(TemplateError::configuration(format!(
                    "markers for {kind} directives cannot be empty"
                )));
            }
            if let Some((other, _)) = seen.iter().find(|(_, open)| *open == markers.open) {
                return Err(TemplateError::configuration(format!(
                    "{kind} and {other} directives share the open marker `{}`",
                    markers.open
                )));
            }
            seen.push((kind, markers.open.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_markers() {
        let syntax = Syntax::default();
        assert_eq!(syntax.markers(DirectiveKind::Plain), None);
        assert_eq!(
            syntax.markers(DirectiveKind::WriteEscaped),
            Some(&Markers::new("<?=", "?>"))
        );
        assert_eq!(syntax.directives().count(), 4);
        assert!(syntax.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_and_shared_markers() {
        let empty = Syntax::default().with_markers(DirectiveKind::Control, "", "?>");
        assert_eq!(empty.validate().map_err(|e| e.kind), Err(ErrorKind::Configuration));

        let shared = Syntax::default().with_markers(DirectiveKind::Control, "<?=", "?>");
        assert_eq!(shared.validate().map_err(|e| e.kind), Err(ErrorKind::Configuration));
    }

    #[test]
    fn test_kind_names_parse_both_cases() {
        for kind in DirectiveKind::ALL {
            assert_eq!(kind.name().parse::<DirectiveKind>().ok(), Some(kind));
        }
        assert_eq!(
            "compilerControl".parse::<DirectiveKind>().ok(),
            Some(DirectiveKind::CompilerControl)
        );
        assert!("comment".parse::<DirectiveKind>().is_err());
    }
}
