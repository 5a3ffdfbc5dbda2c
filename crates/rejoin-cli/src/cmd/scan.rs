use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rejoin_core::Config;
use serde::Serialize;

use crate::cmd::{load_editor, report};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Arguments for `rejoin scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// EPUB file to scan.
    #[arg(value_name = "EPUB")]
    pub epub: PathBuf,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    source: String,
    files: usize,
    paragraphs: usize,
    suggestions: Vec<ScanRow>,
}

#[derive(Debug, Serialize)]
struct ScanRow {
    ordinal: usize,
    position: usize,
    file: String,
    text_a: String,
    text_b: String,
    proposed: String,
}

/// Execute `rejoin scan`: list every merge suggestion without changing anything.
pub fn run_scan(args: &ScanArgs, config: &Config, output: OutputMode) -> Result<()> {
    let editor = load_editor(&args.epub, config, output)?;
    let session = editor.session();
    let index = session.index();

    let suggestions = session
        .suggestions()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Ok(ScanRow {
                ordinal: i + 1,
                position: s.position,
                file: index
                    .file_name_of(s.position)
                    .map_err(|err| report(output, err))?
                    .to_string(),
                text_a: s.text_a.clone(),
                text_b: s.text_b.clone(),
                proposed: s.proposed_merge(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let scan = ScanReport {
        source: editor.source().display().to_string(),
        files: index.files().len(),
        paragraphs: index.entries().len(),
        suggestions,
    };
    render_mode(output, &scan, render_scan_text, render_scan_pretty)
}

fn render_scan_text(scan: &ScanReport, w: &mut dyn Write) -> std::io::Result<()> {
    for row in &scan.suggestions {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            row.ordinal, row.position, row.file, row.text_a, row.text_b
        )?;
    }
    Ok(())
}

fn render_scan_pretty(scan: &ScanReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Scan: {}", scan.source))?;
    pretty_kv(w, "Files", scan.files.to_string())?;
    pretty_kv(w, "Paragraphs", scan.paragraphs.to_string())?;
    pretty_kv(w, "Suggestions", scan.suggestions.len().to_string())?;

    for row in &scan.suggestions {
        writeln!(w)?;
        writeln!(
            w,
            "Suggestion {} of {} (ID: {})  {}",
            row.ordinal,
            scan.suggestions.len(),
            row.position,
            row.file
        )?;
        pretty_rule(w)?;
        pretty_kv(w, "Original 1", &row.text_a)?;
        pretty_kv(w, "Original 2", &row.text_b)?;
        pretty_kv(w, "Proposed", &row.proposed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScanReport {
        ScanReport {
            source: "book.epub".to_string(),
            files: 2,
            paragraphs: 3,
            suggestions: vec![ScanRow {
                ordinal: 1,
                position: 0,
                file: "OEBPS/ch1.xhtml".to_string(),
                text_a: "The sky was".to_string(),
                text_b: "blue.".to_string(),
                proposed: "The sky was blue.".to_string(),
            }],
        }
    }

    #[test]
    fn text_rows_are_tab_separated() {
        let mut buf = Vec::new();
        render_scan_text(&sample(), &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1\t0\tOEBPS/ch1.xhtml\tThe sky was\tblue.\n"
        );
    }

    #[test]
    fn pretty_shows_ordinal_and_id() {
        let mut buf = Vec::new();
        render_scan_pretty(&sample(), &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("Suggestion 1 of 1 (ID: 0)"));
        assert!(out.contains("Proposed:    The sky was blue."));
    }
}
