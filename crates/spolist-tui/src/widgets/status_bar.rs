//! Status bar — banner line and the per-screen keybindings footer.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::ScreenKind;
use crate::keymap::KeyMap;
use crate::theme::{style_error, C_ACCENT, C_MUTED};
use crate::widgets::text::truncate;

/// One-row error banner; draws nothing when there is no message.
pub fn draw_banner(frame: &mut Frame, area: Rect, message: Option<&str>) {
    let Some(msg) = message else {
        return;
    };
    let text = truncate(&format!(" ! {}", msg), area.width as usize);
    frame.render_widget(Paragraph::new(Span::styled(text, style_error())), area);
}

fn screen_label(kind: ScreenKind) -> &'static str {
    match kind {
        ScreenKind::SearchPrompt => "SEARCH",
        ScreenKind::ResultsList => "PLAYLISTS",
        ScreenKind::DeviceList => "DEVICES",
        ScreenKind::Playback => "PLAYBACK",
        ScreenKind::Popup => "HELP",
    }
}

/// Short key hints for `kind`, built from the live key table.
pub fn key_hints(kind: ScreenKind, keys: &KeyMap) -> String {
    let l = KeyMap::label;
    match kind {
        ScreenKind::SearchPrompt => format!(
            "Enter search  0 my playlists  {} quit  {} help",
            l(&keys.back),
            l(&keys.help)
        ),
        ScreenKind::ResultsList | ScreenKind::DeviceList => format!(
            "{} move  {} page  # + Enter pick  {} back  {} help",
            l(&[keys.select_up.clone(), keys.select_down.clone()].concat()),
            l(&[keys.prev_page.clone(), keys.next_page.clone()].concat()),
            l(&keys.back),
            l(&keys.help)
        ),
        ScreenKind::Playback => format!(
            "{} play/pause  {} next  {} prev  {} vol+  {} vol-  {} shuffle  {} back  {} help",
            l(&keys.play_pause),
            l(&keys.next_track),
            l(&keys.prev_track),
            l(&keys.volume_up),
            l(&keys.volume_down),
            l(&keys.shuffle),
            l(&keys.back),
            l(&keys.help)
        ),
        ScreenKind::Popup => "any key closes".to_string(),
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, kind: ScreenKind, keys: &KeyMap) {
    let label = format!(" {} ", screen_label(kind));
    let room = (area.width as usize).saturating_sub(label.chars().count() + 1);
    let line = Line::from(vec![
        Span::styled(
            label,
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(truncate(&key_hints(kind, keys), room), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
