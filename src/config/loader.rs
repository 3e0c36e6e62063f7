use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::Config;
use super::validation::Validate;
use crate::log_error;

pub const CONFIG_FILE_NAME: &str = "vellum.toml";

pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Loader for `path`, or for `vellum.toml` in the working directory.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            config_path: path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Reads and validates the configuration. A missing file gives the defaults,
    /// an unparsable one is reported and replaced by the defaults.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file {}", self.config_path.display())
        })?;

        let mut config: Config = toml::from_str(&content).unwrap_or_else(|e| {
            log_error!(
                "Failed to parse {}: {}. Using defaults.",
                self.config_path.display(),
                e
            );
            Config::default()
        });

        config.validate();
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(&self.config_path, toml_string).with_context(|| {
            format!("Failed to write config file {}", self.config_path.display())
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Severity;
    use crate::module::ModuleType;
    use crate::syntax::Markers;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let loader = ConfigLoader::new(Some(dir.path().join("absent.toml")));
        assert_eq!(loader.load().expect("should load"), Config::default());
    }

    #[test]
    fn test_load_sections() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[syntax]
write_escaped = ["{{", "}}"]

[compile]
async = true
module_type = "es"

[log]
level = "debug"
"#,
        )
        .expect("Failed to write config");

        let config = ConfigLoader::new(Some(path)).load().expect("should load");
        assert_eq!(config.syntax.write_escaped, Some(Markers::new("{{", "}}")));
        assert!(config.compile.is_async);
        assert!(config.compile.cache, "cache defaults to on");
        assert_eq!(config.compile.module_type, ModuleType::Import);
        assert_eq!(config.log.level, Severity::Debug);

        let options = config.options();
        assert_eq!(options.syntax.write_escaped, Markers::new("{{", "}}"));
        assert_eq!(options.syntax.control, Markers::new("<?", "?>"));
        assert!(options.is_async);
        assert!(options.cache.is_some());
    }

    #[test]
    fn test_unparsable_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[compile\nasync = ").expect("Failed to write config");
        let config = ConfigLoader::new(Some(path)).load().expect("should load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let loader = ConfigLoader::new(Some(dir.path().join("nested").join(CONFIG_FILE_NAME)));
        let mut config = Config::default();
        config.syntax.control = Some(Markers::new("{%", "%}"));
        config.compile.encoding = Some("latin1".to_string());

        loader.save(&config).expect("should save");
        assert_eq!(loader.load().expect("should load"), config);
    }
}
