//! Question input widget

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

const PROMPT: &str = "› ";

/// Single-line text input with a character-indexed cursor
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    /// Cursor position in characters
    cursor: usize,
    /// Horizontal scroll offset in display columns
    scroll: usize,
    placeholder: String,
    focused: bool,
}

impl InputBox {
    /// Create a new input box
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether nothing has been typed
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Take the trimmed input for submission. Blank input is left in place.
    pub fn take_submission(&mut self) -> Option<String> {
        let trimmed = self.content.trim();
        if trimmed.is_empty() {
            return None;
        }
        let submitted = trimmed.to_string();
        self.clear();
        Some(submitted)
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn cursor_column(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Remove the characters in `[start, end)` and leave the cursor at `start`
    fn remove_range(&mut self, start: usize, end: usize) {
        let from = self.byte_offset(start);
        let to = self.byte_offset(end);
        self.content.drain(from..to);
        self.cursor = start;
    }

    fn word_start(&self) -> usize {
        let chars: Vec<char> = self.content.chars().take(self.cursor).collect();
        let mut i = chars.len();
        while i > 0 && chars[i - 1] == ' ' {
            i -= 1;
        }
        while i > 0 && chars[i - 1] != ' ' {
            i -= 1;
        }
        i
    }

    /// Apply an editing action. Returns whether the input changed or moved.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let len = self.char_count();
        let handled = match action {
            Action::Char(c) => {
                self.insert(*c);
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    match c {
                        '\r' => {}
                        '\n' | '\t' => self.insert(' '),
                        c if c.is_control() => {}
                        c => self.insert(c),
                    }
                }
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.remove_range(self.cursor - 1, self.cursor);
                true
            }
            Action::Delete if self.cursor < len => {
                let cursor = self.cursor;
                self.remove_range(cursor, cursor + 1);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < len => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = len;
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord if self.cursor > 0 => {
                let start = self.word_start();
                self.remove_range(start, self.cursor);
                true
            }
            _ => false,
        };

        if handled {
            self.update_scroll(width as usize);
        }
        handled
    }

    fn update_scroll(&mut self, width: usize) {
        // Borders and prompt take columns away from the text
        let visible = width.saturating_sub(2 + PROMPT.chars().count()).max(1);
        let column = self.cursor_column();

        if column < self.scroll {
            self.scroll = column;
        } else if column >= self.scroll + visible {
            self.scroll = column + 1 - visible;
        }
    }

    fn visible_text(&self, columns: usize) -> String {
        let mut skipped = 0;
        let mut used = 0;
        let mut visible = String::new();
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if skipped < self.scroll {
                skipped += w;
                continue;
            }
            if used + w > columns {
                break;
            }
            visible.push(c);
            used += w;
        }
        visible
    }

    /// Render the input box
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.focused {
                theme.accent_style()
            } else {
                theme.border_style()
            });

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let prompt_width = PROMPT.chars().count();
        let columns = (inner.width as usize).saturating_sub(prompt_width);
        let body = if self.content.is_empty() {
            Span::styled(self.placeholder.clone(), theme.dim_style())
        } else {
            Span::styled(self.visible_text(columns), theme.base_style())
        };
        let line = Line::from(vec![Span::styled(PROMPT, theme.accent_style()), body]);
        Paragraph::new(line).render(inner, buf);

        if self.focused {
            let x = prompt_width + self.cursor_column().saturating_sub(self.scroll);
            if x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + x as u16, inner.y)) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}
