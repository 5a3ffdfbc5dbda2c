//! Multi-line text buffer behind the merge editor.

use crossterm::event::{KeyCode, KeyEvent};

/// Editable text with a (row, column) cursor counted in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeBuffer {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl Default for MergeBuffer {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

impl MergeBuffer {
    /// Replace the contents and park the cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.row = self.lines.len() - 1;
        self.col = char_len(&self.lines[self.row]);
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Apply an editing key. Keys that do not edit are ignored.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up if self.row > 0 => {
                self.row -= 1;
                self.clamp_col();
            }
            KeyCode::Down if self.row + 1 < self.lines.len() => {
                self.row += 1;
                self.clamp_col();
            }
            KeyCode::Home => self.col = 0,
            KeyCode::End => self.col = char_len(self.line()),
            KeyCode::Enter => self.split_line(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Char(c) => {
                let at = byte_at(self.line(), self.col);
                self.lines[self.row].insert(at, c);
                self.col += 1;
            }
            _ => {}
        }
    }

    /// Line `row` with a block cursor drawn at `col`.
    pub fn line_with_cursor(&self, row: usize) -> String {
        let line = &self.lines[row];
        if row != self.row {
            return line.clone();
        }
        let at = byte_at(line, self.col);
        format!("{}█{}", &line[..at], &line[at..])
    }

    fn line(&self) -> &str {
        &self.lines[self.row]
    }

    fn clamp_col(&mut self) {
        self.col = self.col.min(char_len(self.line()));
    }

    fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = char_len(self.line());
        }
    }

    fn move_right(&mut self) {
        if self.col < char_len(self.line()) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    fn split_line(&mut self) {
        let at = byte_at(self.line(), self.col);
        let tail = self.lines[self.row].split_off(at);
        self.row += 1;
        self.col = 0;
        self.lines.insert(self.row, tail);
    }

    fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            self.remove_at_cursor();
        } else if self.row > 0 {
            let current = self.lines.remove(self.row);
            self.row -= 1;
            self.col = char_len(self.line());
            self.lines[self.row].push_str(&current);
        }
    }

    fn delete(&mut self) {
        if self.col < char_len(self.line()) {
            self.remove_at_cursor();
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    fn remove_at_cursor(&mut self) {
        let line = &mut self.lines[self.row];
        let start = byte_at(line, self.col);
        let end = byte_at(line, self.col + 1);
        line.replace_range(start..end, "");
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Byte offset of char `idx`, or the end of `value`.
fn byte_at(value: &str, idx: usize) -> usize {
    value
        .char_indices()
        .nth(idx)
        .map_or(value.len(), |(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(buf: &mut MergeBuffer, code: KeyCode) {
        buf.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(buf: &mut MergeBuffer, s: &str) {
        for c in s.chars() {
            press(buf, KeyCode::Char(c));
        }
    }

    #[test]
    fn set_text_parks_cursor_at_end() {
        let mut buf = MergeBuffer::default();
        buf.set_text("one\ntwo");
        assert_eq!(buf.line_with_cursor(1), "two█");
        type_str(&mut buf, "!");
        assert_eq!(buf.text(), "one\ntwo!");
    }

    #[test]
    fn editing_handles_multibyte_chars() {
        let mut buf = MergeBuffer::default();
        buf.set_text("café");
        press(&mut buf, KeyCode::Left);
        press(&mut buf, KeyCode::Backspace);
        assert_eq!(buf.text(), "caé");
        press(&mut buf, KeyCode::Delete);
        assert_eq!(buf.text(), "ca");
        assert_eq!(buf.line_with_cursor(0), "ca█");
    }

    #[test]
    fn enter_splits_and_backspace_joins() {
        let mut buf = MergeBuffer::default();
        buf.set_text("The sky was blue");
        for _ in 0..4 {
            press(&mut buf, KeyCode::Left);
        }
        press(&mut buf, KeyCode::Enter);
        assert_eq!(buf.lines(), ["The sky was ", "blue"]);
        assert_eq!(buf.line_with_cursor(1), "█blue");

        press(&mut buf, KeyCode::Backspace);
        assert_eq!(buf.text(), "The sky was blue");
        assert_eq!(buf.line_with_cursor(0), "The sky was █blue");
    }

    #[test]
    fn vertical_moves_clamp_column() {
        let mut buf = MergeBuffer::default();
        buf.set_text("a\nlonger line");
        press(&mut buf, KeyCode::Up);
        assert_eq!(buf.line_with_cursor(0), "a█");
        press(&mut buf, KeyCode::Up);
        assert_eq!(buf.line_with_cursor(0), "a█");
        press(&mut buf, KeyCode::Home);
        press(&mut buf, KeyCode::Left);
        assert_eq!(buf.line_with_cursor(0), "█a");
        assert_eq!(buf.line_with_cursor(1), "longer line");
    }
}
