use crate::logger::Severity;
use crate::module::ModuleType;

use super::types::{CompileConfig, LogConfig};

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            is_async: false,
            encoding: None,
            module_type: ModuleType::default(),
            cache: default_cache(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

pub(super) fn default_cache() -> bool {
    true
}

pub(super) fn default_log_level() -> Severity {
    Severity::Warn
}
