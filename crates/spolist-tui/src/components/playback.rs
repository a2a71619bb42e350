//! Playback screen: the now-playing snapshot plus monitor health.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use spolist_api::model::NowPlayingSnapshot;

use crate::monitor::{NowPlaying, PlaybackView};
use crate::theme::{
    style_default, style_error, style_muted, style_secondary, C_BADGE_ERR, C_BADGE_LIVE,
    C_BADGE_PENDING, C_PAUSED, C_PLAYING, C_PRIMARY,
};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::draw_progress;
use crate::widgets::text::truncate;

fn badge(view: &PlaybackView) -> Badge<'static> {
    if view.needs_reauth {
        return Badge {
            text: "AUTH",
            color: C_BADGE_ERR,
        };
    }
    if view.stale {
        return Badge {
            text: "STALE",
            color: C_BADGE_ERR,
        };
    }
    match &view.now {
        NowPlaying::Track(s) if s.is_playing => Badge {
            text: "PLAYING",
            color: C_BADGE_LIVE,
        },
        NowPlaying::Track(_) => Badge {
            text: "PAUSED",
            color: C_BADGE_PENDING,
        },
        NowPlaying::Nothing => Badge {
            text: "IDLE",
            color: C_BADGE_PENDING,
        },
        NowPlaying::Pending => Badge {
            text: "…",
            color: C_BADGE_PENDING,
        },
    }
}

fn field<'a>(label: &'a str, value: String, width: usize) -> Line<'a> {
    let room = width.saturating_sub(label.len() + 2);
    Line::from(vec![
        Span::styled(format!(" {} ", label), style_muted()),
        Span::styled(truncate(&value, room), style_default()),
    ])
}

fn track_lines(s: &NowPlayingSnapshot, width: usize) -> Vec<Line<'static>> {
    let album = match s.release_year {
        Some(year) => format!("{} ({})", s.album, year),
        None => s.album.clone(),
    };
    vec![
        Line::from(Span::styled(
            format!(" {}", truncate(&s.track, width.saturating_sub(2))),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" {}", truncate(&s.artist_line(), width.saturating_sub(2))),
            style_secondary(),
        )),
        Line::from(Span::styled(
            format!(" {}", truncate(&album, width.saturating_sub(2))),
            style_muted(),
        )),
    ]
}

fn state_line(s: &NowPlayingSnapshot, pending: bool, volume_control: bool) -> Line<'static> {
    let (icon, text, color) = if s.is_playing {
        ("▶", "playing", C_PLAYING)
    } else {
        ("⏸", "paused", C_PAUSED)
    };
    let mut spans = vec![
        Span::styled(format!(" {} {}", icon, text), Style::default().fg(color)),
        Span::styled(
            format!("  shuffle {}", if s.shuffle { "on" } else { "off" }),
            style_secondary(),
        ),
    ];
    match s.volume_percent {
        Some(v) if volume_control => {
            spans.push(Span::styled(format!("  vol {}%", v), style_secondary()))
        }
        _ if !volume_control => spans.push(Span::styled("  volume n/a", style_muted())),
        _ => {}
    }
    if pending {
        spans.push(Span::styled("  …", style_muted()));
    }
    Line::from(spans)
}

pub fn draw(frame: &mut Frame, area: Rect, view: &PlaybackView) {
    let block = pane_chrome("now playing", Some(badge(view)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // playlist + device
            Constraint::Length(1),
            Constraint::Length(3), // track, artist, album
            Constraint::Length(1), // progress
            Constraint::Length(1), // state
            Constraint::Min(0),    // notices
        ])
        .split(inner);
    let width = inner.width as usize;

    let device_name = view
        .snapshot()
        .and_then(|s| s.device_name.clone())
        .unwrap_or_else(|| view.device.name.clone());
    frame.render_widget(
        Paragraph::new(vec![
            field("playlist", view.playlist.name.clone(), width),
            field("device  ", device_name, width),
        ]),
        rows[0],
    );

    match &view.now {
        NowPlaying::Pending => {
            frame.render_widget(
                Paragraph::new(Span::styled(" waiting for playback status…", style_muted())),
                rows[2],
            );
        }
        NowPlaying::Nothing => {
            frame.render_widget(
                Paragraph::new(Span::styled(" nothing playing", style_muted())),
                rows[2],
            );
        }
        NowPlaying::Track(s) => {
            frame.render_widget(Paragraph::new(track_lines(s, width)), rows[2]);
            draw_progress(frame, rows[3], s.progress_ms, s.duration_ms, s.is_playing);
            let state = state_line(s, view.pending.is_some(), view.device.supports_volume);
            frame.render_widget(Paragraph::new(state), rows[4]);
        }
    }

    let mut notices = Vec::new();
    if view.needs_reauth {
        notices.push(Line::from(Span::styled(
            truncate(" needs re-auth: refresh the cached Spotify login", width),
            style_error(),
        )));
    }
    if view.stale {
        notices.push(Line::from(Span::styled(
            truncate(
                &format!(" status may be out of date ({} failed polls)", view.failures),
                width,
            ),
            style_error(),
        )));
    }
    if let Some(notice) = &view.notice {
        notices.push(Line::from(Span::styled(
            truncate(&format!(" {}", notice), width),
            style_secondary(),
        )));
    }
    if !notices.is_empty() {
        frame.render_widget(Paragraph::new(notices), rows[5]);
    }
}
