use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rejoin_core::Config;

use crate::cmd::load_editor;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use crate::tui::review::{ReviewOutcome, run_review};

/// Arguments for `rejoin fix`.
#[derive(Args, Debug)]
pub struct FixArgs {
    /// EPUB file to review.
    #[arg(value_name = "EPUB")]
    pub epub: PathBuf,

    /// Where to write the repaired EPUB. The change log goes next to it.
    #[arg(short, long, value_name = "OUT")]
    pub output: PathBuf,
}

/// Execute `rejoin fix`: review suggestions interactively.
pub fn run_fix(args: &FixArgs, config: &Config, output: OutputMode) -> Result<()> {
    let editor = load_editor(&args.epub, config, output)?;
    let outcome = run_review(editor, &args.output)?;
    render_mode(output, &outcome, render_outcome_text, render_outcome_pretty)
}

fn render_outcome_text(outcome: &ReviewOutcome, w: &mut dyn Write) -> std::io::Result<()> {
    match &outcome.saved {
        Some(report) => writeln!(
            w,
            "saved\t{}\t{}\t{}",
            report.archive.display(),
            report.log.display(),
            report.changes
        ),
        None => writeln!(w, "not saved\t{} accepted decisions discarded", outcome.accepted),
    }
}

fn render_outcome_pretty(outcome: &ReviewOutcome, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Review finished")?;
    pretty_kv(w, "Accepted", outcome.accepted.to_string())?;
    pretty_kv(w, "Skipped", outcome.skipped.to_string())?;
    pretty_kv(w, "Remaining", outcome.remaining.to_string())?;
    match &outcome.saved {
        Some(report) => {
            pretty_kv(w, "Archive", report.archive.display().to_string())?;
            pretty_kv(w, "Log", report.log.display().to_string())?;
        }
        None => pretty_kv(w, "Saved", "no")?,
    }
    Ok(())
}
