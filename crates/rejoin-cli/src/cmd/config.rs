use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use rejoin_core::Config;
use rejoin_core::config::user_config_path;
use serde::Serialize;

use crate::output::{OutputMode, render_mode};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
}

#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    /// File the values were read from, if it exists.
    source: Option<PathBuf>,
    workdir: PathBuf,
    #[serde(flatten)]
    config: &'a Config,
}

pub fn run_config(
    args: &ConfigArgs,
    explicit: Option<&Path>,
    config: &Config,
    output: OutputMode,
) -> Result<()> {
    match args.command {
        ConfigCommand::Show => run_show(explicit, config, output),
    }
}

fn run_show(explicit: Option<&Path>, config: &Config, output: OutputMode) -> Result<()> {
    let source = explicit
        .map(Path::to_path_buf)
        .or_else(user_config_path)
        .filter(|path| path.exists());
    let effective = EffectiveConfig {
        source,
        workdir: config.session.resolved_workdir(),
        config,
    };

    let toml_text = toml::to_string_pretty(config).context("failed to render config as TOML")?;
    let header = match &effective.source {
        Some(path) => format!("# source: {}", path.display()),
        None => "# source: built-in defaults".to_string(),
    };
    let workdir_line = format!("# workdir: {}", effective.workdir.display());

    render_mode(
        output,
        &effective,
        |_, w| write!(w, "{toml_text}"),
        |_, w| {
            writeln!(w, "{header}")?;
            writeln!(w, "{workdir_line}")?;
            write!(w, "{toml_text}")
        },
    )
}
