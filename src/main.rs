//! Config Bindings demo - reads or follows a single key of a TOML file.

use std::{error::Error, path::PathBuf, process, sync::Arc};

use clap::{Parser, Subcommand, ValueEnum};
use config_bindings::{
    Bindable, BindingContext, BoxError, ConfigReader, ReaderFactory, ReaderSetup, SharedReader,
    TypedValue, ValueKind,
    providers::{FileProviderOptions, TomlFileProvider},
    tracing_config,
};
use futures::StreamExt;
use tracing::{info, info_span};

#[derive(Parser)]
#[command(name = "config-bindings", version, about = "Bind TOML configuration keys to values")]
struct Cli {
    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current value of a key
    Get {
        /// TOML file to read
        file: PathBuf,
        /// Dot-separated key path
        key: String,
        /// Value printed when the key is absent or of another kind
        #[arg(long)]
        default: Option<String>,
        /// Kind of value expected at the key
        #[arg(long, value_enum, default_value_t = KindArg::String)]
        kind: KindArg,
    },
    /// Print the value of a key and every change until interrupted
    Watch {
        /// TOML file to read and watch
        file: PathBuf,
        /// Dot-separated key path
        key: String,
        /// Value used when the key is absent or of another kind
        #[arg(long)]
        default: Option<String>,
        /// Kind of value expected at the key
        #[arg(long, value_enum, default_value_t = KindArg::String)]
        kind: KindArg,
        /// Quiet period before a changed file is re-read
        #[arg(long, default_value_t = 500)]
        debounce_ms: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    String,
    Int,
    Double,
    Bool,
    StringArray,
}

impl From<KindArg> for ValueKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::String => ValueKind::String,
            KindArg::Int => ValueKind::Int,
            KindArg::Double => ValueKind::Double,
            KindArg::Bool => ValueKind::Bool,
            KindArg::StringArray => ValueKind::StringArray,
        }
    }
}

enum Mode {
    Get,
    Watch,
}

struct Request {
    mode: Mode,
    context: BindingContext,
    key: String,
    default: Option<TypedValue>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match &cli.log_dir {
        Some(dir) => tracing_config::init_with_file(dir)?,
        None => tracing_config::init()?,
    }

    let (mode, file, key, default, kind, options) = match cli.command {
        Command::Get {
            file,
            key,
            default,
            kind,
        } => (Mode::Get, file, key, default, kind, FileProviderOptions::default()),
        Command::Watch {
            file,
            key,
            default,
            kind,
            debounce_ms,
        } => {
            let options = FileProviderOptions {
                debounce_ms,
                ..FileProviderOptions::default()
            };
            (Mode::Watch, file, key, default, kind, options)
        }
    };

    let kind = ValueKind::from(kind);
    let default = match default.map(|raw| parse_value(kind, &raw)).transpose() {
        Ok(default) => default,
        Err(message) => {
            eprintln!("{message}");
            process::exit(2);
        }
    };

    let request = Request {
        mode,
        context: BindingContext::new(file_reader_factory(file, options)),
        key,
        default,
    };

    match kind {
        ValueKind::String => run::<String>(request).await,
        ValueKind::Int => run::<i64>(request).await,
        ValueKind::Double => run::<f64>(request).await,
        ValueKind::Bool => run::<bool>(request).await,
        ValueKind::StringArray => run::<Vec<String>>(request).await,
    }

    Ok(())
}

/// Factory that loads `file` and keeps it watched for the life of the process.
fn file_reader_factory(file: PathBuf, options: FileProviderOptions) -> ReaderFactory {
    ReaderFactory::new(move || {
        let file = file.clone();
        let options = options.clone();

        async move {
            let provider = Arc::new(TomlFileProvider::with_options(&file, options)?);
            let logger = info_span!("config_services", path = %file.display());

            Ok::<_, BoxError>(
                ReaderSetup::new(ConfigReader::from_arc(provider.clone()))
                    .with_service(provider)
                    .with_logger(logger),
            )
        }
    })
}

async fn run<T: Bindable + Default>(request: Request) {
    let Request {
        mode,
        context,
        key,
        default,
    } = request;
    let default = default.and_then(T::from_typed).unwrap_or_default();

    match mode {
        Mode::Get => {
            let value = context.key::<T>(key.as_str()).load(default).await;
            println!("{}", format_value(value.into_typed()));
        }
        Mode::Watch => {
            let shared = SharedReader::new(context.key::<T>(key.as_str()), default).await;
            let values = shared.watch();
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(values, ctrl_c);

            loop {
                tokio::select! {
                    _ = &mut ctrl_c => {
                        info!("Interrupted, stopping");
                        break;
                    }
                    value = values.next() => match value {
                        Some(value) => println!("{key} = {}", format_value(value.into_typed())),
                        None => break,
                    },
                }
            }
        }
    }
}

fn parse_value(kind: ValueKind, raw: &str) -> Result<TypedValue, String> {
    let invalid = |e: &dyn std::fmt::Display| format!("invalid {kind} default '{raw}': {e}");

    match kind {
        ValueKind::String => Ok(TypedValue::String(raw.to_string())),
        ValueKind::Int => raw.parse().map(TypedValue::Int).map_err(|e| invalid(&e)),
        ValueKind::Double => raw.parse().map(TypedValue::Double).map_err(|e| invalid(&e)),
        ValueKind::Bool => raw.parse().map(TypedValue::Bool).map_err(|e| invalid(&e)),
        ValueKind::StringArray => Ok(TypedValue::StringArray(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
        )),
    }
}

fn format_value(value: TypedValue) -> String {
    match value {
        TypedValue::String(value) => value,
        TypedValue::Int(value) => value.to_string(),
        TypedValue::Double(value) => value.to_string(),
        TypedValue::Bool(value) => value.to_string(),
        TypedValue::StringArray(values) => format!("[{}]", values.join(", ")),
    }
}
