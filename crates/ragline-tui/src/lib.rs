//! ragline-tui: terminal rendering for ragline conversations
//!
//! Widgets built on ratatui and crossterm. Everything here renders plain
//! text; nothing interprets answer content as markup.

pub mod input;
pub mod terminal;
pub mod theme;
pub mod widgets;

pub use terminal::Tui;
pub use theme::Theme;
