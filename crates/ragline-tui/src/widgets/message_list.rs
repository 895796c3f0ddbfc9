//! Message list widget for displaying the conversation
//!
//! Answer text is shown literally. Control characters are stripped first
//! so server content cannot move the cursor or recolor the terminal.

use crate::theme::Theme;
use crate::widgets::spinner::frame_at;
use ragline_client::{Message, Role, Sanitizer, Source};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::Instant;

/// Shown when the conversation is empty
pub const EMPTY_STATE: &str = "No messages yet. Send a question to start the conversation.";

const WAITING_LABEL: &str = "waiting for response…";
const INDENT: &str = "  ";

/// Remove control characters. Tabs become spaces; newlines are kept.
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Display title of the source at zero-based `index`
pub fn source_title(source: &Source, index: usize) -> String {
    let title = strip_control(&source.title).replace('\n', " ");
    let title = title.trim();
    if title.is_empty() {
        format!("Source {}", index + 1)
    } else {
        title.to_string()
    }
}

/// Builds the lines for a conversation snapshot
pub struct MessageRenderer<'a> {
    sanitizer: &'a Sanitizer,
    theme: &'a Theme,
    waiting_since: Option<Instant>,
}

impl<'a> MessageRenderer<'a> {
    /// Create a renderer that links sources through `sanitizer`
    pub fn new(sanitizer: &'a Sanitizer, theme: &'a Theme) -> Self {
        Self {
            sanitizer,
            theme,
            waiting_since: None,
        }
    }

    /// Show a waiting indicator on an empty trailing assistant message
    pub fn waiting(mut self, since: Option<Instant>) -> Self {
        self.waiting_since = since;
        self
    }

    /// Render every message into wrapped lines for a viewport `width` columns wide
    pub fn lines(&self, messages: &[Message], width: usize) -> Vec<Line<'static>> {
        if messages.is_empty() {
            return vec![Line::from(Span::styled(EMPTY_STATE, self.theme.dim_style()))];
        }

        let last = messages.len() - 1;
        let mut lines = Vec::new();
        for (i, msg) in messages.iter().enumerate() {
            self.push_message(&mut lines, msg, i == last, width);
        }
        lines
    }

    fn push_message(&self, lines: &mut Vec<Line<'static>>, msg: &Message, is_last: bool, width: usize) {
        let prefix = match msg.role {
            Role::User => "▶ ",
            Role::Assistant => "◀ ",
        };
        lines.push(Line::from(Span::styled(
            format!("{}{}", prefix, msg.role.label()),
            self.theme.role_style(msg.role),
        )));

        let content_width = width.saturating_sub(INDENT.len()).max(1);

        match self.waiting_since {
            Some(since) if is_last && msg.role == Role::Assistant && msg.content.is_empty() => {
                lines.push(Line::from(Span::styled(
                    format!("{}{} {}", INDENT, frame_at(since.elapsed()), WAITING_LABEL),
                    self.theme.pending_style(),
                )));
            }
            _ => {
                let content = strip_control(&msg.content);
                for paragraph in content.lines() {
                    for row in textwrap::wrap(paragraph, content_width) {
                        lines.push(Line::from(Span::styled(
                            format!("{}{}", INDENT, row),
                            self.theme.base_style(),
                        )));
                    }
                }
            }
        }

        if !msg.sources.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("{}Sources:", INDENT),
                self.theme.dim_style(),
            )));
            for (i, source) in msg.sources.iter().enumerate() {
                lines.push(self.source_line(source, i));
            }
        }

        lines.push(Line::from(""));
    }

    fn source_line(&self, source: &Source, index: usize) -> Line<'static> {
        let marker = Span::styled(format!("{}{}. ", INDENT, index + 1), self.theme.dim_style());
        let title = source_title(source, index);
        let href = self.sanitizer.url(&source.url);

        if href.is_empty() {
            Line::from(vec![marker, Span::styled(title, self.theme.base_style())])
        } else {
            Line::from(vec![
                marker,
                Span::styled(title, self.theme.link_style()),
                Span::styled(format!(" {}", href), self.theme.dim_style()),
            ])
        }
    }
}

/// Widget for displaying the conversation
pub struct MessageList<'a> {
    messages: &'a [Message],
    renderer: MessageRenderer<'a>,
    notice: Option<&'a str>,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    /// Create a list over `messages`
    pub fn new(messages: &'a [Message], renderer: MessageRenderer<'a>) -> Self {
        Self {
            messages,
            renderer,
            notice: None,
            scroll: 0,
        }
    }

    /// Local text (command output) shown below the conversation. Not part of the log.
    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    /// Set scroll offset in lines
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = self.renderer.lines(self.messages, width);
        if let Some(notice) = self.notice {
            let style = self.renderer.theme.dim_style();
            for row in strip_control(notice).lines() {
                lines.push(Line::from(Span::styled(row.to_string(), style)));
            }
        }
        lines
    }

    /// Total rendered height at `width`
    pub fn content_height(&self, width: usize) -> usize {
        self.lines(width).len()
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let visible: Vec<Line> = self
            .lines(area.width as usize)
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Modifier;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn render(messages: &[Message], waiting: Option<Instant>) -> Vec<Line<'static>> {
        let sanitizer = Sanitizer::from_origin("https://app.test");
        let theme = Theme::dark();
        MessageRenderer::new(&sanitizer, &theme)
            .waiting(waiting)
            .lines(messages, 80)
    }

    #[test]
    fn test_empty_state() {
        let lines = render(&[], None);
        assert_eq!(lines.len(), 1);
        assert_eq!(text(&lines[0]), EMPTY_STATE);
    }

    #[test]
    fn test_role_labels_and_content() {
        let lines = render(
            &[Message::user("question"), Message::assistant("answer", vec![])],
            None,
        );
        let texts: Vec<String> = lines.iter().map(text).collect();
        assert_eq!(
            texts,
            vec!["▶ You", "  question", "", "◀ Assistant", "  answer", ""]
        );
    }

    #[test]
    fn test_content_is_literal_and_stripped() {
        let lines = render(
            &[Message::assistant("<b>hi</b> \u{1b}[31mred\u{7}\tok", vec![])],
            None,
        );
        assert_eq!(text(&lines[1]), "  <b>hi</b> [31mred ok");
    }

    #[test]
    fn test_multiline_content() {
        let lines = render(&[Message::assistant("one\ntwo", vec![])], None);
        assert_eq!(text(&lines[1]), "  one");
        assert_eq!(text(&lines[2]), "  two");
    }

    #[test]
    fn test_sources_render_links_and_plain_text() {
        let msg = Message::assistant(
            "a",
            vec![
                Source::new("Doc", "/docs/1"),
                Source::new("  ", "https://s.test"),
                Source::new("No link", ""),
                Source::new("Bad", "javascript:alert(1)"),
            ],
        );
        let lines = render(&[msg], None);
        let texts: Vec<String> = lines.iter().map(text).collect();

        assert_eq!(texts[2], "  Sources:");
        assert_eq!(texts[3], "  1. Doc https://app.test/docs/1");
        assert_eq!(texts[4], "  2. Source 2 https://s.test/");
        assert_eq!(texts[5], "  3. No link");
        assert_eq!(texts[6], "  4. Bad");

        assert!(lines[3].spans[1].style.add_modifier.contains(Modifier::UNDERLINED));
        assert!(!lines[5].spans[1].style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(lines[6].spans.len(), 2);
    }

    #[test]
    fn test_waiting_indicator_on_empty_trailing_answer() {
        let messages = [Message::user("q"), Message::assistant("", vec![])];

        let lines = render(&messages, Some(Instant::now()));
        assert!(text(&lines[4]).ends_with(WAITING_LABEL));

        let idle = render(&messages, None);
        assert_eq!(idle.len(), 5);
    }

    #[test]
    fn test_wraps_to_width() {
        let sanitizer = Sanitizer::default();
        let theme = Theme::dark();
        let msg = Message::assistant("alpha beta gamma delta", vec![]);
        let lines = MessageRenderer::new(&sanitizer, &theme).lines(&[msg], 14);
        let texts: Vec<String> = lines.iter().map(text).collect();
        assert_eq!(texts[1], "  alpha beta");
        assert_eq!(texts[2], "  gamma delta");
    }

    #[test]
    fn test_widget_scrolls() {
        let sanitizer = Sanitizer::default();
        let theme = Theme::dark();
        let messages = [Message::user("first"), Message::user("second")];
        let list = MessageList::new(&messages, MessageRenderer::new(&sanitizer, &theme)).scroll(3);
        assert_eq!(list.content_height(40), 6);

        let area = Rect::new(0, 0, 40, 2);
        let mut buf = Buffer::empty(area);
        list.render(area, &mut buf);
        let row: String = (0..area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect();
        assert!(row.starts_with("▶ You"), "row: {:?}", row);
        let row: String = (0..area.width)
            .map(|x| buf[(x, 1)].symbol().to_string())
            .collect();
        assert!(row.starts_with("  second"), "row: {:?}", row);
    }

    #[test]
    fn test_notice_follows_conversation() {
        let sanitizer = Sanitizer::default();
        let theme = Theme::dark();
        let messages = [Message::user("q")];
        let list = MessageList::new(&messages, MessageRenderer::new(&sanitizer, &theme))
            .notice(Some("Mock mode: on\nsecond line"));
        let lines = list.lines(40);
        assert_eq!(lines.len(), 5);
        assert_eq!(text(&lines[3]), "Mock mode: on");
        assert_eq!(text(&lines[4]), "second line");
    }

    #[test]
    fn test_source_title_fallback() {
        assert_eq!(source_title(&Source::new("", ""), 0), "Source 1");
        assert_eq!(source_title(&Source::new(" T\n2 ", ""), 4), "T 2");
    }
}
