//! Headless review driven by a decision script.
//!
//! One decision per line: `accept`, `accept <text>`, `skip`, or `back`.
//! Blank lines and lines starting with `#` are ignored. Suggestions left
//! when the script runs out stay undecided.

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use rejoin_core::{Config, Editor, SaveReport, UndoRecord};
use serde::Serialize;

use crate::cmd::{load_editor, report};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};

/// Arguments for `rejoin apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// EPUB file to repair.
    #[arg(value_name = "EPUB")]
    pub epub: PathBuf,

    /// Where to write the repaired EPUB. The change log goes next to it.
    #[arg(short, long, value_name = "OUT")]
    pub output: PathBuf,

    /// Decision script; reads stdin when omitted.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    /// Accept the proposal, or the given text instead.
    Accept(Option<String>),
    Skip,
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScriptLine {
    line: usize,
    decision: Decision,
}

#[derive(Debug, Serialize)]
struct ApplySummary {
    accepted: usize,
    skipped: usize,
    remaining: usize,
    #[serde(flatten)]
    saved: SaveReport,
}

fn parse_script(source: &str) -> Result<Vec<ScriptLine>, CliError> {
    let mut out = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));
        let decision = match (word, rest) {
            ("accept", "") => Decision::Accept(None),
            ("accept", text) => Decision::Accept(Some(text.to_string())),
            ("skip", "") => Decision::Skip,
            ("back", "") => Decision::Back,
            _ => {
                return Err(CliError::with_details(
                    format!("line {}: unrecognized decision {line:?}", idx + 1),
                    "use `accept`, `accept <text>`, `skip`, or `back`",
                    "script_syntax",
                ));
            }
        };
        out.push(ScriptLine {
            line: idx + 1,
            decision,
        });
    }
    Ok(out)
}

/// Execute `rejoin apply`.
pub fn run_apply(args: &ApplyArgs, config: &Config, output: OutputMode) -> Result<()> {
    let source = match &args.script {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read script from stdin")?;
            buf
        }
    };

    let script = match parse_script(&source) {
        Ok(script) => script,
        Err(cli_err) => {
            render_error(output, &cli_err)?;
            bail!(cli_err.message);
        }
    };

    let mut editor = load_editor(&args.epub, config, output)?;
    for step in &script {
        apply_one(&mut editor, &step.decision)
            .map_err(|err| report(output, err))
            .with_context(|| format!("script line {}", step.line))?;
    }

    let saved = editor.save(&args.output).map_err(|err| report(output, err))?;
    let session = editor.session();
    let summary = ApplySummary {
        accepted: session.accepted(),
        skipped: session
            .history()
            .iter()
            .filter(|r| matches!(r, UndoRecord::Skipped { .. }))
            .count(),
        remaining: session.suggestions().len() - session.cursor(),
        saved,
    };
    render_mode(output, &summary, render_summary_text, render_summary_pretty)
}

fn apply_one(editor: &mut Editor, decision: &Decision) -> rejoin_core::error::Result<()> {
    match decision {
        Decision::Accept(Some(text)) => editor.accept(text),
        Decision::Accept(None) => {
            let proposed = editor.current()?.proposed;
            editor.accept(&proposed)
        }
        Decision::Skip => editor.skip(),
        Decision::Back => editor.back(),
    }
}

fn render_summary_text(summary: &ApplySummary, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "accepted={} skipped={} remaining={} archive={} log={}",
        summary.accepted,
        summary.skipped,
        summary.remaining,
        summary.saved.archive.display(),
        summary.saved.log.display()
    )
}

fn render_summary_pretty(summary: &ApplySummary, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Decisions applied")?;
    pretty_kv(w, "Accepted", summary.accepted.to_string())?;
    pretty_kv(w, "Skipped", summary.skipped.to_string())?;
    pretty_kv(w, "Remaining", summary.remaining.to_string())?;
    pretty_kv(w, "Archive", summary.saved.archive.display().to_string())?;
    pretty_kv(w, "Log", summary.saved.log.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decisions_comments_and_blanks() {
        let script = parse_script(
            "# first pass\naccept\n\n  skip  \naccept The sky was blue.\nback\n",
        )
        .unwrap();
        let decisions: Vec<(usize, Decision)> =
            script.into_iter().map(|s| (s.line, s.decision)).collect();
        assert_eq!(
            decisions,
            vec![
                (2, Decision::Accept(None)),
                (4, Decision::Skip),
                (5, Decision::Accept(Some("The sky was blue.".to_string()))),
                (6, Decision::Back),
            ]
        );
    }

    #[test]
    fn accept_text_keeps_inner_spacing() {
        let script = parse_script("accept   a  b ").unwrap();
        assert_eq!(
            script[0].decision,
            Decision::Accept(Some("a  b".to_string()))
        );
    }

    #[test]
    fn unknown_word_reports_line() {
        let err = parse_script("skip\nmerge it\n").unwrap_err();
        assert!(err.message.starts_with("line 2:"));
        assert_eq!(err.error_code.as_deref(), Some("script_syntax"));
    }

    #[test]
    fn skip_with_argument_is_rejected() {
        assert!(parse_script("skip now").is_err());
    }
}
