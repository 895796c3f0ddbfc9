//! Color theme support

use ragline_client::Role;
use ratatui::style::{Color, Modifier, Style};

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Primary text color
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// User label and prompt color
    pub accent: Color,
    /// Assistant label color
    pub assistant: Color,
    /// Error color
    pub error: Color,
    /// Waiting indicator color
    pub pending: Color,
    /// Border color
    pub border: Color,
    /// Link color
    pub link: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            assistant: Color::Green,
            error: Color::Red,
            pending: Color::Yellow,
            border: Color::DarkGray,
            link: Color::Blue,
        }
    }

    /// Get base style
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg)
    }

    /// Get dimmed style
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    /// Get accent style
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Get error style
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Get border style
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Style of the waiting indicator
    pub fn pending_style(&self) -> Style {
        Style::default().fg(self.pending)
    }

    /// Style of a clickable source title
    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link)
            .add_modifier(Modifier::UNDERLINED)
    }

    /// Bold label style for a message author
    pub fn role_style(&self, role: Role) -> Style {
        let color = match role {
            Role::User => self.accent,
            Role::Assistant => self.assistant,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Status line style
    pub fn status_style(&self, is_error: bool) -> Style {
        if is_error {
            self.error_style()
        } else {
            self.dim_style()
        }
    }
}
