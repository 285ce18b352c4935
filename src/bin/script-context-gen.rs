use std::fs;
use std::io::{self, IsTerminal as _, Read as _, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use script_context_gen::{
    extract_parameters_with_config, generate_script_context_with_config, GeneratorConfig,
    LineEnding, ScriptContextError,
};

/// Generate a C# ScriptContext class from automation script parameters
#[derive(Parser, Debug)]
#[command(name = "script-context-gen", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit the ScriptContext class for a manifest
    Generate(GenerateArgs),
    /// print the extracted script parameters as JSON
    Params(ParamsArgs),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// manifest file, or '-' for stdin
    #[arg(default_value = "-")]
    input: String,

    /// JSON generator config
    #[arg(long)]
    config: Option<PathBuf>,

    /// namespace URI of ScriptParameter elements ("" for unqualified)
    #[arg(long)]
    manifest_namespace: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .cs file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// line ending of the generated code
    #[arg(long, value_enum)]
    line_ending: Option<LineEndingArg>,
}

#[derive(Args, Debug)]
struct ParamsArgs {
    #[command(flatten)]
    input_settings: InputSettings,

    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LineEndingArg {
    Lf,
    Crlf,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Lf => LineEnding::Lf,
            LineEndingArg::Crlf => LineEnding::CrLf,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli.global) {
        eprintln!("warning: {err}");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), ScriptContextError> {
    match command {
        Command::Generate(args) => run_generate(args),
        Command::Params(args) => run_params(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), ScriptContextError> {
    let mut config = load_config(&args.input_settings)?;
    if let Some(line_ending) = args.line_ending {
        config.line_ending = line_ending.into();
    }

    let input = read_input(&args.input_settings.input)?;
    let output = generate_script_context_with_config(&input, &config)?;

    match args.output {
        Some(path) => {
            fs::write(&path, output)?;
            info!(path = %path.display(), "wrote ScriptContext");
        }
        None => io::stdout().write_all(output.as_bytes())?,
    }
    Ok(())
}

fn run_params(args: ParamsArgs) -> Result<(), ScriptContextError> {
    let config = load_config(&args.input_settings)?;
    let input = read_input(&args.input_settings.input)?;
    let params = extract_parameters_with_config(&input, &config)?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&params)
    } else {
        serde_json::to_string(&params)
    }
    .map_err(|e| ScriptContextError::SerializationError(e.to_string()))?;

    println!("{rendered}");
    Ok(())
}

fn load_config(settings: &InputSettings) -> Result<GeneratorConfig, ScriptContextError> {
    let mut config = match &settings.config {
        Some(path) => GeneratorConfig::from_path(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(namespace) = &settings.manifest_namespace {
        config.manifest_namespace = namespace.clone();
    }
    debug!(?config, "resolved generator config");
    Ok(config)
}

fn read_input(input: &str) -> Result<String, ScriptContextError> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }

    fs::read_to_string(input).map_err(|e| {
        ScriptContextError::Io(io::Error::new(
            e.kind(),
            format!("failed to read '{input}': {e}"),
        ))
    })
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the flags.
fn init_logging(args: &GlobalArgs) -> Result<(), String> {
    let level = derive_level(args);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("script_context_gen={level}")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| format!("failed to initialise tracing: {e}"))
}

fn derive_level(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
