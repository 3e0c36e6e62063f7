use serde::{Deserialize, Serialize};

use crate::compiler::Cache;
use crate::logger::Severity;
use crate::module::ModuleType;
use crate::options::Options;
use crate::syntax::{DirectiveKind, Markers, Syntax};

use super::defaults::{default_cache, default_log_level};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub syntax: SyntaxConfig,

    #[serde(default)]
    pub compile: CompileConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Marker overrides. Kinds left out keep their default markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyntaxConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain: Option<Markers>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_control: Option<Markers>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_escaped: Option<Markers>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_unescaped: Option<Markers>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Markers>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompileConfig {
    #[serde(default, rename = "async")]
    pub is_async: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(default)]
    pub module_type: ModuleType,

    /// Share one compilation cache between every include of a run.
    #[serde(default = "default_cache")]
    pub cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: Severity,

    /// Write logs to the rotating log file instead of the terminal.
    #[serde(default)]
    pub file: bool,
}

impl SyntaxConfig {
    pub fn entries(&self) -> [(DirectiveKind, Option<&Markers>); 5] {
        [
            (DirectiveKind::Plain, self.plain.as_ref()),
            (DirectiveKind::CompilerControl, self.compiler_control.as_ref()),
            (DirectiveKind::WriteEscaped, self.write_escaped.as_ref()),
            (DirectiveKind::WriteUnescaped, self.write_unescaped.as_ref()),
            (DirectiveKind::Control, self.control.as_ref()),
        ]
    }

    /// Default syntax with these overrides applied.
    pub fn to_syntax(&self) -> Syntax {
        let mut syntax = Syntax::default();
        for (kind, markers) in self.entries() {
            if let Some(markers) = markers {
                syntax.set_markers(kind, markers.clone());
            }
        }
        syntax
    }
}

impl Config {
    /// Compiler options described by this configuration.
    pub fn options(&self) -> Options {
        let mut options = Options::new()
            .with_syntax(self.syntax.to_syntax())
            .asynchronous(self.compile.is_async)
            .with_module_type(self.compile.module_type);
        if let Some(encoding) = &self.compile.encoding {
            options = options.with_encoding(encoding.clone());
        }
        if self.compile.cache {
            options = options.with_cache(Cache::new());
        }
        options
    }
}
