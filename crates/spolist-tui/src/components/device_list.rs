//! Device picker screen.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::components::results_list::{pad_to, page_footer, row};
use crate::screen::DeviceList;
use crate::theme::{style_muted, style_secondary};
use crate::widgets::pane_chrome::pane_chrome;
use crate::widgets::text::truncate;

pub fn draw(frame: &mut Frame, area: Rect, devices: &DeviceList, typed: &str) {
    let title = truncate(
        &format!("devices for {}", devices.playlist.name),
        area.width.saturating_sub(4) as usize,
    );
    let block = pane_chrome(&title, None);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if devices.list.is_empty() {
        let lines = vec![
            Line::from(Span::styled("  no devices found", style_secondary())),
            Line::from(""),
            Line::from(Span::styled(
                "  open Spotify on a phone, desktop or speaker, then go back and pick the playlist again",
                style_muted(),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
        return;
    }

    let width = inner.width as usize;
    let mut lines: Vec<Line> = devices
        .list
        .page_items()
        .into_iter()
        .map(|(index, d)| {
            let selected = devices.list.selected_index() == Some(index);
            let mut detail = format!(" ({})", d.kind);
            if d.is_active {
                detail.push_str(" · active");
            }
            row(index, &d.name, &detail, selected, width)
        })
        .collect();
    pad_to(&mut lines, inner.height.saturating_sub(1) as usize);
    lines.push(page_footer(&devices.list, "devices", typed, width));
    frame.render_widget(Paragraph::new(lines), inner);
}
