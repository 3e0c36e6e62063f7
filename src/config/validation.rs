use crate::loader::resolve_encoding;
use crate::log_warn;

use super::types::{CompileConfig, Config, SyntaxConfig};

pub trait Validate {
    fn validate(&mut self);
}

impl Validate for SyntaxConfig {
    fn validate(&mut self) {
        for markers in [
            &mut self.plain,
            &mut self.compiler_control,
            &mut self.write_escaped,
            &mut self.write_unescaped,
            &mut self.control,
        ] {
            if markers.as_ref().is_some_and(|m| m.is_empty()) {
                log_warn!("Invalid markers {:?}: markers cannot be empty. Using default.", markers);
                *markers = None;
            }
        }

        if let Err(e) = self.to_syntax().validate() {
            log_warn!("Invalid syntax: {}. Using default markers.", e.info);
            *self = SyntaxConfig::default();
        }
    }
}

impl Validate for CompileConfig {
    fn validate(&mut self) {
        if let Some(label) = &self.encoding {
            if resolve_encoding(Some(label)).is_err() {
                log_warn!("Invalid encoding: {label}. Using default: utf-8");
                self.encoding = None;
            }
        }
    }
}

impl Validate for Config {
    fn validate(&mut self) {
        self.syntax.validate();
        self.compile.validate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Markers;

    #[test]
    fn test_empty_markers_are_reset() {
        let mut syntax = SyntaxConfig {
            control: Some(Markers::new("", "%}")),
            write_escaped: Some(Markers::new("{{", "}}")),
            ..Default::default()
        };
        syntax.validate();
        assert_eq!(syntax.control, None);
        assert_eq!(syntax.write_escaped, Some(Markers::new("{{", "}}")));
    }

    #[test]
    fn test_conflicting_markers_fall_back_to_defaults() {
        let mut syntax = SyntaxConfig {
            control: Some(Markers::new("{{", "}}")),
            write_escaped: Some(Markers::new("{{", "}}")),
            ..Default::default()
        };
        syntax.validate();
        assert_eq!(syntax, SyntaxConfig::default());
    }

    #[test]
    fn test_unknown_encoding_is_dropped() {
        let mut compile = CompileConfig {
            encoding: Some("klingon".to_string()),
            ..Default::default()
        };
        compile.validate();
        assert_eq!(compile.encoding, None);
    }
}
