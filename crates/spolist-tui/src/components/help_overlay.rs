//! Help popup — centered key reference for the screen underneath.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::action::ScreenKind;
use crate::keymap::KeyMap;
use crate::theme::{C_MUTED, C_PANEL_BORDER, C_POPUP_BG, C_PRIMARY, C_SECONDARY};

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!(" {}", title),
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row(key: String, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<16}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc.to_string(), Style::default().fg(C_SECONDARY)),
    ])
}

/// Help text for `topic`, using the live key table.
pub fn help_lines(topic: ScreenKind, keys: &KeyMap) -> Vec<Line<'static>> {
    let l = KeyMap::label;
    let mut lines = vec![
        Line::from(Span::styled(
            " keyboard shortcuts",
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    match topic {
        ScreenKind::SearchPrompt | ScreenKind::Popup => {
            lines.push(section("search"));
            lines.push(help_row("type".into(), "playlist name to search for"));
            lines.push(help_row("0".into(), "list your own playlists"));
            lines.push(help_row("Enter".into(), "run the search"));
            lines.push(help_row(l(&keys.back), "quit (cancels a running search)"));
        }
        ScreenKind::ResultsList | ScreenKind::DeviceList => {
            lines.push(section(if topic == ScreenKind::ResultsList {
                "playlists"
            } else {
                "devices"
            }));
            lines.push(help_row(
                format!("{} / {}", l(&keys.select_up), l(&keys.select_down)),
                "move selection",
            ));
            lines.push(help_row(
                format!("{} / {}", l(&keys.prev_page), l(&keys.next_page)),
                "previous / next page",
            ));
            lines.push(help_row("Enter".into(), "pick highlighted row"));
            lines.push(help_row("1-9… Enter".into(), "pick by number"));
            lines.push(help_row(l(&keys.back), "back to search"));
            lines.push(help_row(l(&keys.quit), "quit"));
        }
        ScreenKind::Playback => {
            lines.push(section("playback"));
            lines.push(help_row(l(&keys.play_pause), "play / pause"));
            lines.push(help_row(l(&keys.next_track), "next track"));
            lines.push(help_row(l(&keys.prev_track), "previous track"));
            lines.push(help_row(l(&keys.volume_up), "volume up"));
            lines.push(help_row(l(&keys.volume_down), "volume down"));
            lines.push(help_row(l(&keys.shuffle), "toggle shuffle"));
            lines.push(help_row(l(&keys.back), "pause and back to search"));
            lines.push(help_row(l(&keys.quit), "pause and quit"));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " press any key to close",
        Style::default().fg(C_MUTED),
    )));
    lines
}

pub fn draw(frame: &mut Frame, area: Rect, topic: ScreenKind, keys: &KeyMap) {
    let lines = help_lines(topic, keys);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = centered_rect(68, height, area);

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(C_PANEL_BORDER))
                    .style(Style::default().bg(C_POPUP_BG)),
            )
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}
