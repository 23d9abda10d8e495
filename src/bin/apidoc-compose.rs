//! apidoc-compose CLI
//!
//! Command-line interface for resolving and composing API description documents.

use std::path::PathBuf;
use std::process::ExitCode;

use apidoc_compose::{
    compose, input_uri, resolve_inputs, run_pipeline, ArtifactStore, CancellationToken,
    DocumentHandle, FileSystemInput, JsonPath, ResolveError,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "apidoc-compose")]
#[command(about = "Resolve and compose literate API description documents")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline described by a configuration document
    Run {
        /// Configuration document: file path or URL
        config: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Resolve the references of one document
    Resolve {
        /// Input document: file path or URL
        input: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Resolve and compose several documents
    Compose {
        /// Input documents: file paths or URLs
        #[arg(required = true)]
        inputs: Vec<String>,

        #[command(flatten)]
        compose: ComposeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show where a node of the composed document was written
    Trace {
        /// Input documents: file paths or URLs
        #[arg(required = true)]
        inputs: Vec<String>,

        /// JSON pointer into the composed document (e.g. /definitions/Pet)
        #[arg(long)]
        pointer: String,

        #[command(flatten)]
        compose: ComposeArgs,

        /// Output locations as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ComposeArgs {
    /// Merge documents as they are, without the Azure preparation
    #[arg(long)]
    no_azure: bool,

    /// Title of the composed document
    #[arg(long)]
    title: Option<String>,

    /// Description of the composed document
    #[arg(long)]
    description: Option<String>,
}

impl ComposeArgs {
    fn info_override(&self) -> Option<Value> {
        let mut info = Map::new();
        if let Some(title) = &self.title {
            info.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &self.description {
            info.insert("description".to_string(), json!(description));
        }
        (!info.is_empty()).then_some(Value::Object(info))
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let result = match cli.command {
        Commands::Run { config, output } => run_run(&config, &output, &cancel),
        Commands::Resolve { input, output } => run_resolve(&input, &output, &cancel),
        Commands::Compose {
            inputs,
            compose,
            output,
        } => run_compose(&inputs, &compose, &cancel)
            .and_then(|composed| write_output(composed.object(), &output)),
        Commands::Trace {
            inputs,
            pointer,
            compose,
            json,
        } => run_trace(&inputs, &pointer, &compose, json, &cancel),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Print `error` and turn its exit code into a process exit code.
fn fail(error: impl std::fmt::Display, exit_code: i32) -> u8 {
    eprintln!("Error: {}", error);
    u8::try_from(exit_code).unwrap_or(1)
}

fn run_run(config: &str, output: &OutputArgs, cancel: &CancellationToken) -> Result<(), u8> {
    let uri = input_uri(config).map_err(|e| fail(&e, e.exit_code()))?;
    let store = ArtifactStore::new();
    let result =
        run_pipeline(&uri, &FileSystemInput, &store, cancel).map_err(|e| fail(&e, e.exit_code()))?;

    let composed = result
        .composed()
        .ok_or_else(|| fail("pipeline produced no composed document", 2))?;
    write_output(composed.object(), output)
}

fn run_resolve(input: &str, output: &OutputArgs, cancel: &CancellationToken) -> Result<(), u8> {
    let resolved = resolve_all(&[input.to_string()], &ArtifactStore::new(), cancel)?;
    match resolved.first() {
        Some(document) => write_output(document.object(), output),
        None => Err(fail("nothing to resolve", 2)),
    }
}

fn run_compose(
    inputs: &[String],
    args: &ComposeArgs,
    cancel: &CancellationToken,
) -> Result<DocumentHandle, u8> {
    let store = ArtifactStore::new();
    let documents = resolve_all(inputs, &store, cancel)?;
    compose(
        &store.root().create_scope("compose"),
        args.info_override().as_ref(),
        &documents,
        !args.no_azure,
        cancel,
    )
    .map_err(|e| fail(&e, e.exit_code()))
}

fn run_trace(
    inputs: &[String],
    pointer: &str,
    args: &ComposeArgs,
    json_output: bool,
    cancel: &CancellationToken,
) -> Result<(), u8> {
    let composed = run_compose(inputs, args, cancel)?;
    let path = JsonPath::locate(pointer, composed.object())
        .ok_or_else(|| fail(format!("'{}' not found in composed document", pointer), 2))?;

    let locations = composed.trace(&path);
    if json_output {
        let rendered = serde_json::to_string_pretty(&locations)
            .map_err(|e| fail(format!("cannot serialize locations: {}", e), 2))?;
        println!("{}", rendered);
    } else {
        for location in &locations {
            println!("{}", location);
        }
    }
    Ok(())
}

fn resolve_all(
    inputs: &[String],
    store: &ArtifactStore,
    cancel: &CancellationToken,
) -> Result<Vec<DocumentHandle>, u8> {
    let uris = inputs
        .iter()
        .map(|input| input_uri(input))
        .collect::<Result<Vec<Url>, ResolveError>>()
        .map_err(|e| fail(&e, e.exit_code()))?;
    resolve_inputs(&FileSystemInput, &uris, &store.root().create_scope("loader"), cancel)
        .map_err(|e| fail(&e, e.exit_code()))
}

fn write_output(document: &Value, args: &OutputArgs) -> Result<(), u8> {
    let rendered = match args.format {
        Format::Json if args.pretty => serde_json::to_string_pretty(document).map_err(|e| e.to_string()),
        Format::Json => serde_json::to_string(document).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::to_string(document).map_err(|e| e.to_string()),
    }
    .map_err(|e| fail(format!("cannot serialize output: {}", e), 2))?;

    match &args.output {
        Some(path) => std::fs::write(path, &rendered).map_err(|e| {
            fail(format!("cannot write to {}: {}", path.display(), e), 3)
        }),
        None => {
            println!("{}", rendered.trim_end());
            Ok(())
        }
    }
}
