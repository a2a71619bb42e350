//! PaneChrome — the bordered frame around each screen's body.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

use crate::theme::{style_border, C_PRIMARY};

/// A badge shown in the top-right of the pane header (e.g. "LIVE", "STALE").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

pub fn pane_chrome<'a>(title: &'a str, badge: Option<Badge<'a>>) -> Block<'a> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border())
        .title(Line::from(Span::styled(
            format!(" {} ", title),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )));

    match badge {
        Some(b) => block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}
