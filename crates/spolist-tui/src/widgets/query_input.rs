//! Single-line query field backed by tui-input.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::Input;

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED};

const PROMPT: &str = "> ";

/// Render `input` into a one-row `area`. The cursor is shown only when
/// `focused`.
pub fn draw(frame: &mut Frame, area: Rect, input: &Input, placeholder: &str, focused: bool) {
    if area.height == 0 || area.width <= PROMPT.len() as u16 {
        return;
    }
    let width = area.width.saturating_sub(PROMPT.len() as u16 + 1) as usize;
    let scroll = input.visual_scroll(width);
    let value = input.value();

    let text = if value.is_empty() {
        Span::styled(format!("{}{}", PROMPT, placeholder), Style::default().fg(C_MUTED))
    } else {
        let visible: String = value.chars().skip(scroll).collect();
        Span::styled(format!("{}{}", PROMPT, visible), Style::default().fg(C_INPUT_FG))
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![text])).style(Style::default().bg(C_INPUT_BG)),
        area,
    );

    if focused {
        let offset = input.visual_cursor().saturating_sub(scroll) as u16;
        let x = area.x + PROMPT.len() as u16 + offset;
        frame.set_cursor_position((x.min(area.x + area.width - 1), area.y));
    }
}
