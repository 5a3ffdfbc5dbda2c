#![forbid(unsafe_code)]

mod cmd;
mod output;
mod tui;

use std::env;
use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use rejoin_core::config::load_config;
use tracing::debug;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "rejoin",
    author,
    version,
    about = "rejoin: repair paragraphs split mid-sentence in EPUB books",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (alias for `--format json`).
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file to use instead of the per-user one.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Review",
        about = "List merge suggestions",
        long_about = "Extract an EPUB, index its paragraphs, and list every suspected broken-sentence pair without changing anything.",
        after_help = "EXAMPLES:\n    # List suggestions\n    rejoin scan book.epub\n\n    # Emit machine-readable output\n    rejoin scan book.epub --format json"
    )]
    Scan(cmd::scan::ScanArgs),

    #[command(
        next_help_heading = "Review",
        about = "Review suggestions interactively",
        long_about = "Step through suggestions in a terminal UI. Edit the proposed merge, accept, skip, or go back, then save a repaired copy and its change log.",
        after_help = "EXAMPLES:\n    # Review and save to fixed.epub (log: fixed_log.txt)\n    rejoin fix book.epub -o fixed.epub\n\nKEYS:\n    Ctrl+S / Ctrl+Enter  accept      Ctrl+K  skip\n    Ctrl+B               back        Ctrl+W  save & quit\n    Esc                  quit without saving"
    )]
    Fix(cmd::fix::FixArgs),

    #[command(
        next_help_heading = "Review",
        about = "Apply decisions from a script",
        long_about = "Apply one decision per line (accept, accept <text>, skip, back) from a file or stdin, then save.",
        after_help = "EXAMPLES:\n    # Accept the first suggestion, skip the second\n    printf 'accept\\nskip\\n' | rejoin apply book.epub -o fixed.epub\n\n    # Use a script file\n    rejoin apply book.epub -o fixed.epub --script decisions.txt"
    )]
    Apply(cmd::apply::ApplyArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Inspect configuration",
        after_help = "EXAMPLES:\n    # Show effective configuration\n    rejoin config show\n\n    # Emit machine-readable output\n    rejoin config show --format json"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    rejoin completions bash\n\n    # Generate zsh completions\n    rejoin completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, silence: bool) {
    let filter = EnvFilter::try_from_env("REJOIN_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "rejoin=debug,info"
        } else {
            "rejoin=info,warn"
        })
    });

    let format = env::var("REJOIN_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    // the review screen owns the terminal
    let writer = if silence {
        BoxMakeWriter::new(io::sink)
    } else {
        BoxMakeWriter::new(io::stderr)
    };

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(writer))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(writer))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Fix(_)));

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            let output = resolve_output_mode(cli.format, cli.json, None);
            render_error(output, &CliError::from(&err))?;
            return Err(err.into());
        }
    };
    let output = resolve_output_mode(cli.format, cli.json, config.output.as_deref());
    debug!(?output, "resolved output mode");

    match cli.command {
        Commands::Scan(args) => cmd::scan::run_scan(&args, &config, output),
        Commands::Fix(args) => cmd::fix::run_fix(&args, &config, output),
        Commands::Apply(args) => cmd::apply::run_apply(&args, &config, output),
        Commands::Config(args) => {
            cmd::config::run_config(&args, cli.config.as_deref(), &config, output)
        }
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
