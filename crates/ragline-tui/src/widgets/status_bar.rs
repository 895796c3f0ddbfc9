//! One-line status bar: current status on the left, key hints on the right

use crate::theme::Theme;
use crate::widgets::spinner::Spinner;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::Instant;

const HINTS: &str = "Ctrl+L: clear │ PgUp/PgDn: scroll │ Ctrl+C: quit";

pub struct StatusBar<'a> {
    status: &'a str,
    is_error: bool,
    modes: &'a str,
    busy_since: Option<Instant>,
    theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    /// Create a status bar showing `status`
    pub fn new(status: &'a str, theme: &'a Theme) -> Self {
        Self {
            status,
            is_error: false,
            modes: "",
            busy_since: None,
            theme,
        }
    }

    /// Render the status in the error style
    pub fn error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// Summary of the active settings, e.g. `stream │ http://localhost:8000/query`
    pub fn modes(mut self, modes: &'a str) -> Self {
        self.modes = modes;
        self
    }

    /// Show a spinner while a send is in flight
    pub fn busy(mut self, since: Option<Instant>) -> Self {
        self.busy_since = since;
        self
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        if let Some(start) = self.busy_since {
            Spinner::new(self.status, self.theme)
                .with_start_time(start)
                .render(area, buf);
            return;
        }

        let left = if self.modes.is_empty() {
            self.status.to_string()
        } else {
            format!("{} │ {}", self.modes, self.status)
        };
        let left_width = left.chars().count();
        let right_width = HINTS.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            Line::from(vec![
                Span::styled(left, self.theme.status_style(self.is_error)),
                Span::raw(" ".repeat(available - left_width - right_width)),
                Span::styled(HINTS, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left, self.theme.status_style(self.is_error)))
        };

        Paragraph::new(line).render(area, buf);
    }
}
