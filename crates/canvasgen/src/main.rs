//! Binary entry point for the canvasgen CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Render the canvas next to the facts file, using the settings found there
//! canvasgen generate --facts build/facts.json
//!
//! # Explicit settings and output, JSON response
//! canvasgen generate --facts facts.json --settings canvas.toml --output docs/canvas.md --format json
//!
//! # Validate a settings file without rendering
//! canvasgen check --settings bounded_context_canvas_settings.toml
//! ```
//!
//! Errors are always reported as a JSON envelope on stdout; the process exit
//! code is the error's numeric code.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use canvasgen_core::config::CanvasSettings;
use canvasgen_core::document::{generate, GenerateRequest};
use canvasgen_core::error::{CanvasError, OutputErrorCode};
use canvasgen_core::output::{emit_response, CheckResponse, ErrorResponse, GenerateResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Bounded Context Canvas generator.
///
/// Renders the inbound communication of a bounded context as Mermaid
/// flowcharts from extracted type facts.
#[derive(Parser, Debug)]
#[command(name = "canvasgen", version, about = "Bounded Context Canvas generator")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Format of log lines written to stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Output format for generate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum GenerateFormat {
    /// Path of the written document (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Write the canvas document for a facts file.
    Generate {
        /// JSON facts file produced by an extractor.
        #[arg(long)]
        facts: PathBuf,
        /// Settings file (default: bounded_context_canvas_settings.toml next to the facts).
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Output document (default: bounded_context_canvas.md next to the facts).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: GenerateFormat,
    },
    /// Compile a settings file and report what it configures.
    Check {
        /// Settings file to validate.
        #[arg(long)]
        settings: PathBuf,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            tracing::debug!(code = error_code.code(), error = %err, "command failed");

            let _ = emit_response(&ErrorResponse::from_error(&err), &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), CanvasError> {
    match cli.command {
        Command::Generate {
            facts,
            settings,
            output,
            format,
        } => execute_generate(
            GenerateRequest {
                facts,
                settings,
                output,
            },
            format,
        ),
        Command::Check { settings } => execute_check(settings),
    }
}

fn execute_generate(request: GenerateRequest, format: GenerateFormat) -> Result<(), CanvasError> {
    let report = generate(&request)?;

    let mut stdout = io::stdout();
    let written = match format {
        GenerateFormat::Text => writeln!(stdout, "{}", report.output.display()),
        GenerateFormat::Json => emit_response(&GenerateResponse::from_report(&report), &mut stdout),
    };
    written.map_err(|e| CanvasError::internal(format!("failed to write response: {}", e)))
}

fn execute_check(settings: PathBuf) -> Result<(), CanvasError> {
    let compiled = CanvasSettings::load(&settings)?;
    emit_response(&CheckResponse::new(&settings, &compiled), &mut io::stdout())
        .map_err(|e| CanvasError::internal(format!("failed to write response: {}", e)))
}
