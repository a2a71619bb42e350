//! Search prompt screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::Span,
    widgets::Paragraph,
    Frame,
};

use crate::screen::SearchPrompt;
use crate::theme::{style_default, style_muted, style_secondary, C_BADGE_PENDING};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::query_input;

pub fn draw(frame: &mut Frame, area: Rect, prompt: &SearchPrompt, focused: bool) {
    let badge = prompt.loading.then_some(Badge {
        text: "SEARCHING",
        color: C_BADGE_PENDING,
    });
    let block = pane_chrome("search", badge);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(" search playlists", style_default())),
        rows[0],
    );
    query_input::draw(
        frame,
        rows[1],
        &prompt.input,
        "playlist name, or 0 for your own",
        focused && !prompt.loading,
    );

    let status = if prompt.loading {
        Some(Span::styled(" searching…", style_secondary()))
    } else {
        prompt
            .hint
            .as_deref()
            .map(|h| Span::styled(format!(" {}", h), style_muted()))
    };
    if let Some(status) = status {
        frame.render_widget(Paragraph::new(status), rows[3]);
    }
}
