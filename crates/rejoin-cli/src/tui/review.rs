//! Interactive review screen: one suggestion at a time with an editable merge.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::border;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use rejoin_core::{Editor, RejoinError, SaveReport, SessionState, UndoRecord};
use serde::Serialize;

use super::buffer::MergeBuffer;

const STATUS_TTL: Duration = Duration::from_secs(3);

/// How the review ended.
#[derive(Debug, Serialize)]
pub struct ReviewOutcome {
    pub accepted: usize,
    pub skipped: usize,
    pub remaining: usize,
    pub saved: Option<SaveReport>,
}

pub struct ReviewView {
    editor: Editor,
    output: PathBuf,
    buffer: MergeBuffer,
    status_msg: Option<(String, Instant, bool)>,
    confirm_quit: bool,
    should_quit: bool,
    saved: Option<SaveReport>,
}

impl ReviewView {
    pub fn new(editor: Editor, output: PathBuf) -> Self {
        let mut view = Self {
            editor,
            output,
            buffer: MergeBuffer::default(),
            status_msg: None,
            confirm_quit: false,
            should_quit: false,
            saved: None,
        };
        view.load_proposal();
        view
    }

    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_msg = Some((msg.into(), Instant::now(), false));
    }

    fn set_error(&mut self, err: &RejoinError) {
        self.status_msg = Some((format!("{err}"), Instant::now(), true));
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code != KeyCode::Esc {
            self.confirm_quit = false;
        }

        match key.code {
            KeyCode::Esc => self.request_quit(),
            KeyCode::Char('s') | KeyCode::Enter if ctrl => self.accept(),
            KeyCode::Char('k') if ctrl => self.decide(Editor::skip, "Skipped"),
            KeyCode::Char('b') if ctrl => self.decide(Editor::back, "Went back one step"),
            KeyCode::Char('w') if ctrl => self.save_and_quit(),
            _ if ctrl => {}
            _ => {
                if self.editor.state() == SessionState::Active {
                    self.buffer.handle_key(key);
                }
            }
        }
    }

    fn accept(&mut self) {
        let text = self.buffer.text();
        let merged = text.trim();
        if merged.is_empty() {
            self.set_status("Merged text is empty; edit it or skip");
            return;
        }
        let merged = merged.to_string();
        self.decide(|editor| editor.accept(&merged), "Merged");
    }

    fn decide(&mut self, op: impl FnOnce(&mut Editor) -> Result<(), RejoinError>, done: &str) {
        match op(&mut self.editor) {
            Ok(()) => {
                self.set_status(done);
                self.load_proposal();
            }
            Err(err) => {
                tracing::warn!(error = %err, "decision failed");
                self.set_error(&err);
                if !matches!(err, RejoinError::InvalidState { .. }) {
                    self.load_proposal();
                }
            }
        }
    }

    fn save_and_quit(&mut self) {
        match self.editor.save(&self.output) {
            Ok(report) => {
                self.saved = Some(report);
                self.should_quit = true;
            }
            Err(err) => self.set_error(&err),
        }
    }

    fn request_quit(&mut self) {
        if self.editor.session().history().is_empty() || self.confirm_quit {
            self.should_quit = true;
        } else {
            self.confirm_quit = true;
            self.set_status("Decisions are not saved. Press Esc again to quit, Ctrl+W to save");
        }
    }

    fn load_proposal(&mut self) {
        match self.editor.current() {
            Ok(current) => self.buffer.set_text(&current.proposed),
            Err(_) => self.buffer.set_text(""),
        }
    }

    pub fn into_outcome(self) -> ReviewOutcome {
        let session = self.editor.session();
        let skipped = session
            .history()
            .iter()
            .filter(|r| matches!(r, UndoRecord::Skipped { .. }))
            .count();
        ReviewOutcome {
            accepted: session.accepted(),
            skipped,
            remaining: session.suggestions().len() - session.cursor(),
            saved: self.saved,
        }
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        frame.render_widget(Paragraph::new(self.header_line()), chunks[0]);
        match self.editor.current() {
            Ok(current) => {
                let body = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Percentage(25),
                        Constraint::Percentage(25),
                        Constraint::Percentage(50),
                    ])
                    .split(chunks[1]);
                frame.render_widget(text_panel(" Original 1 ", &current.text_a), body[0]);
                frame.render_widget(text_panel(" Original 2 ", &current.text_b), body[1]);
                frame.render_widget(self.merge_panel(), body[2]);
            }
            Err(_) => frame.render_widget(self.done_panel(), chunks[1]),
        }
        frame.render_widget(Paragraph::new(self.status_line()), chunks[2]);
    }

    fn header_line(&self) -> Line<'static> {
        let title = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(Color::DarkGray);
        match self.editor.current() {
            Ok(current) => Line::from(vec![
                Span::styled(
                    format!(
                        "Suggestion {} of {} (ID: {})",
                        current.ordinal, current.total, current.position
                    ),
                    title,
                ),
                Span::styled(format!("  {}", current.file), dim),
            ]),
            Err(_) => Line::from(Span::styled("Review complete", title)),
        }
    }

    fn merge_panel(&self) -> Paragraph<'static> {
        let lines: Vec<Line<'static>> = (0..self.buffer.lines().len())
            .map(|row| Line::from(self.buffer.line_with_cursor(row)))
            .collect();
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(Color::Green))
                .title(" Merged "),
        )
    }

    fn done_panel(&self) -> Paragraph<'static> {
        let session = self.editor.session();
        let message = if session.suggestions().is_empty() {
            "No broken paragraphs found.".to_string()
        } else {
            format!(
                "All {} suggestions reviewed ({} merged).",
                session.suggestions().len(),
                session.accepted()
            )
        };
        Paragraph::new(vec![
            Line::from(message),
            Line::from(""),
            Line::from(format!("Ctrl+W saves to {}", self.output.display())),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
    }

    fn status_line(&self) -> Line<'static> {
        if let Some((msg, at, is_error)) = &self.status_msg {
            if at.elapsed() < STATUS_TTL || self.confirm_quit {
                let color = if *is_error { Color::Red } else { Color::Cyan };
                return Line::from(Span::styled(msg.clone(), Style::default().fg(color)));
            }
        }

        let key_style = Style::default().fg(Color::Cyan);
        let dim_style = Style::default().fg(Color::DarkGray);
        let hints: &[(&str, &str)] = if self.editor.state() == SessionState::Active {
            &[
                ("CTRL+S", "accept"),
                ("CTRL+K", "skip"),
                ("CTRL+B", "back"),
                ("CTRL+W", "save & quit"),
                ("ESC", "quit"),
            ]
        } else {
            &[("CTRL+B", "back"), ("CTRL+W", "save & quit"), ("ESC", "quit")]
        };
        let spans: Vec<Span<'static>> = hints
            .iter()
            .flat_map(|(key, label)| {
                [
                    Span::styled((*key).to_string(), key_style),
                    Span::styled(format!(" {label}  "), dim_style),
                ]
            })
            .collect();
        Line::from(spans)
    }
}

fn text_panel(title: &'static str, text: &str) -> Paragraph<'static> {
    Paragraph::new(text.to_string())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        )
}

/// Run the review screen until the user saves or quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn to.
pub fn run_review(editor: Editor, output: &Path) -> Result<ReviewOutcome> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut view = ReviewView::new(editor, output.to_path_buf());
    let result = event_loop(&mut terminal, &mut view);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;
    Ok(view.into_outcome())
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, view: &mut ReviewView) -> Result<()> {
    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            view.render(frame, area);
        })?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    view.handle_key(key);
                }
            }
        }

        if view.should_quit() {
            return Ok(());
        }
    }
}
