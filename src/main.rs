use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use vellum::config::{Config, ConfigLoader};
use vellum::logger::{self, Severity};
use vellum::{Locals, ModuleType, TemplateCompiler, log_debug, log_error, log_info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "vellum: compiles directive templates into Rhai render functions.",
    long_about = "vellum compiles templates mixing literal text with <?= ?>, <?- ?>, <? ?> and <?: ?>\n\
    directives into Rhai functions, then renders them or packages them as Rhai modules."
)]
struct Cli {
    /// Configuration file (defaults to ./vellum.toml when present)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log compilation steps
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a template and render it
    Render {
        /// Template file
        file: PathBuf,

        /// JSON file holding the input record, `-` for stdin
        #[arg(short, long, value_name = "JSON")]
        data: Option<PathBuf>,

        /// Compile an asynchronous template
        #[arg(long = "async")]
        is_async: bool,
    },
    /// Print the generated template source
    Code {
        /// Template file
        file: PathBuf,
    },
    /// Package a template as a Rhai module
    Module {
        /// Template file
        file: PathBuf,

        /// How the module imports its escape helper: import or require
        #[arg(short, long, value_name = "TYPE")]
        module_type: Option<ModuleType>,

        /// Write the module here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Write a configuration file holding the default settings
    Init {
        /// Where to write it (defaults to ./vellum.toml)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_standalone();
    if cli.verbose {
        logger::set_level(Severity::Debug);
    }

    if let Err(e) = run(cli).await {
        log_error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let loader = ConfigLoader::new(cli.config.clone());
    let config = loader.load()?;
    if !cli.verbose {
        logger::set_level(config.log.level);
    }
    if config.log.file {
        logger::set_file_mode();
        if let Some(path) = logger::log_file_path() {
            log_debug!("Logging to {}", path.display());
        }
    }
    log_debug!("Using configuration from {}", loader.config_path().display());

    let mut options = config.options();
    match cli.command {
        Command::Render {
            file,
            data,
            is_async,
        } => {
            options.is_async |= is_async;
            let locals = match data {
                Some(path) => Locals::from_json(&read_json(&path)?)?,
                None => Locals::new(),
            };
            let template = TemplateCompiler::new(options)
                .compile_file_async(file.clone())
                .await
                .with_context(|| format!("Failed to compile {}", file.display()))?;
            let rendered = template
                .render_async(locals)
                .await
                .with_context(|| format!("Failed to render {}", file.display()))?;
            print!("{rendered}");
        }
        Command::Code { file } => {
            let code = TemplateCompiler::new(options)
                .file_to_code(&file)
                .with_context(|| format!("Failed to compile {}", file.display()))?;
            println!("{code}");
        }
        Command::Module {
            file,
            module_type,
            output,
        } => {
            if let Some(module_type) = module_type {
                options.module_type = module_type;
            }
            let module = TemplateCompiler::new(options)
                .file_to_module(&file)
                .with_context(|| format!("Failed to compile {}", file.display()))?;
            match output {
                Some(path) => {
                    fs::write(&path, module)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log_info!("Wrote {}", path.display());
                }
                None => print!("{module}"),
            }
        }
        Command::Init { path } => {
            let target = ConfigLoader::new(path.or(cli.config));
            target.save(&Config::default())?;
            log_info!("Wrote {}", target.config_path().display());
        }
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read input record from stdin")?;
        text
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read input record {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}
