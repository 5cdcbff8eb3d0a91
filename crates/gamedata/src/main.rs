//! gamedata - inspect and edit game save data from the command line.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gamedata::{BackendKind, Config, Manager};
use gamedata_util::log::{LogConfig, LogLevel};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "gamedata")]
#[command(author, version, about = "Inspect and edit game save data", long_about = None)]
struct Cli {
    /// Application name the data belongs to
    #[arg(long, global = true)]
    app: Option<String>,

    /// Backend to use (auto, filesystem, flat)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Base directory replacing the platform default
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_parser = parse_log_level, default_value = "warn")]
    log_level: LogLevel,

    /// Enable verbose logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the properties of an object
    List { object: String },
    /// Print a property to stdout
    Get {
        object: String,
        prop: Option<String>,
        /// Read at most this many bytes
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Write a property
    Put {
        object: String,
        prop: Option<String>,
        /// Value to store
        #[arg(long, conflicts_with = "file")]
        value: Option<String>,
        /// Read the value from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete a property, or the whole object when no property is given
    Rm { object: String, prop: Option<String> },
    /// Report whether an object or property exists
    Exists { object: String, prop: Option<String> },
    /// Print the storage path of a property
    Path { object: String, prop: Option<String> },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    gamedata_util::log::init(LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            cli.log_level
        },
        ..LogConfig::default()
    });

    let config = build_config(&cli)?;
    debug!(app = %config.app_name, backend = config.backend.as_str(), "Resolved configuration");
    let manager = Manager::open(config).context("failed to open game data storage")?;

    run(&manager, cli.command)
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::parse(s).ok_or_else(|| format!("unknown log level: {s}"))
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match (&cli.config, &cli.app) {
        (Some(path), _) => Config::load_file(path)?,
        (None, Some(app)) => Config::new(app.as_str()),
        (None, None) => bail!("either --app or --config is required"),
    };

    if let (Some(_), Some(app)) = (&cli.config, &cli.app) {
        config.app_name = app.clone();
    }
    if let Some(backend) = &cli.backend {
        config.backend = backend.parse::<BackendKind>()?;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

fn run(manager: &Manager, command: Commands) -> anyhow::Result<()> {
    let prop_or_default = |prop: &Option<String>| prop.clone().unwrap_or_default();

    match command {
        Commands::List { object } => {
            let mut props = manager.list_object_props(&object)?;
            props.sort();
            for prop in props {
                println!("{}", prop);
            }
        }
        Commands::Get { object, prop, limit } => {
            let prop = prop_or_default(&prop);
            let data = match limit {
                Some(limit) => {
                    let mut buf = vec![0u8; limit];
                    let n = manager.read_object_prop(&object, &prop, &mut buf)?;
                    if n == 0 && !manager.object_prop_exists(&object, &prop) {
                        None
                    } else {
                        buf.truncate(n);
                        Some(buf)
                    }
                }
                None => manager.load_object_prop(&object, &prop)?,
            };
            let Some(data) = data else {
                bail!("no such property: {}", manager.object_prop_path(&object, &prop));
            };
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
        Commands::Put {
            object,
            prop,
            value,
            file,
        } => {
            let data = match (value, file) {
                (Some(value), _) => value.into_bytes(),
                (None, Some(path)) => std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => bail!("either --value or --file is required"),
            };
            manager.save_object_prop(&object, &prop_or_default(&prop), &data)?;
        }
        Commands::Rm { object, prop } => match prop {
            Some(prop) => manager.delete_object_prop(&object, &prop)?,
            None => manager.delete_object(&object)?,
        },
        Commands::Exists { object, prop } => {
            let exists = match prop {
                Some(prop) => manager.object_prop_exists(&object, &prop),
                None => manager.object_exists(&object),
            };
            println!("{}", exists);
        }
        Commands::Path { object, prop } => {
            println!("{}", manager.object_prop_path(&object, &prop_or_default(&prop)));
        }
    }

    Ok(())
}
