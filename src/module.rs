//! Packages artifact source as a standalone Rhai module text.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::sandbox::{ESCAPE_FN, INVOKE_FN};

/// Name under which the escape helper module is expected to be resolvable.
pub const ESCAPE_MODULE: &str = "html-escape";

/// How the packaged module obtains its escape helper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    /// `import` statement, resolved by the host's module resolver.
    #[serde(alias = "es", alias = "es15")]
    Import,
    /// Synchronous `require(...)` lookup through a host-provided function.
    #[default]
    #[serde(alias = "common")]
    Require,
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleType::Import => f.write_str("import"),
            ModuleType::Require => f.write_str("require"),
        }
    }
}

impl FromStr for ModuleType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "import" | "es" | "es15" => Ok(ModuleType::Import),
            "require" | "common" => Ok(ModuleType::Require),
            other => Err(TemplateError::configuration(format!(
                "unknown module type `{other}`, expected `import` or `require`"
            ))),
        }
    }
}

/// Wraps artifact `code` into module text exporting it as `template`.
pub fn build_module(code: &str, module_type: ModuleType) -> String {
    let prelude = match module_type {
        ModuleType::Import => format!(
            "import \"{ESCAPE_MODULE}\" as __html;\nfn {ESCAPE_FN}(value) {{ __html::escape(value) }}\n"
        ),
        ModuleType::Require => format!(
            "fn {ESCAPE_FN}(value) {{ require(\"{ESCAPE_MODULE}\").call(value) }}\n"
        ),
    };
    format!(
        "{prelude}fn {INVOKE_FN}(artifact) {{ artifact.call(#{{}}) }}\n\
         fn {INVOKE_FN}(artifact, locals) {{ artifact.call(locals) }}\n\
         export const template = {code};\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const CODE: &str = "|locals| { let __r = \"\";__r }";

    #[test]
    fn test_import_module_text() {
        let text = build_module(CODE, ModuleType::Import);
        assert!(text.starts_with("import \"html-escape\" as __html;\n"));
        assert!(text.contains("fn __e(value) { __html::escape(value) }"));
        assert!(text.contains("fn __i(artifact) { artifact.call(#{}) }\n"));
        assert!(text.contains("fn __i(artifact, locals) { artifact.call(locals) }\n"));
        assert!(text.ends_with(&format!("export const template = {CODE};\n")));
    }

    #[test]
    fn test_require_module_text() {
        let text = build_module(CODE, ModuleType::Require);
        assert!(!text.contains("import"), "require modules have no import");
        assert!(text.contains("require(\"html-escape\")"));
        assert!(text.ends_with(&format!("export const template = {CODE};\n")));
    }

    #[test]
    fn test_module_type_names() {
        assert_eq!("es15".parse::<ModuleType>().ok(), Some(ModuleType::Import));
        assert_eq!("common".parse::<ModuleType>().ok(), Some(ModuleType::Require));
        let err = "amd".parse::<ModuleType>().expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
