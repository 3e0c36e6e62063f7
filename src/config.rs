//! `vellum.toml`, the command-line tool's configuration.
//!
//! ```toml
//! [syntax]
//! write_escaped = ["{{", "}}"]
//! control = ["{%", "%}"]
//!
//! [compile]
//! async = false
//! encoding = "utf-8"
//! module_type = "import"
//!
//! [log]
//! level = "warn"
//! ```

mod defaults;
mod loader;
mod types;
mod validation;

pub use loader::{CONFIG_FILE_NAME, ConfigLoader};
pub use types::{CompileConfig, Config, LogConfig, SyntaxConfig};
pub use validation::Validate;
