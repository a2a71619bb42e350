//! Playlist results screen.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use unicode_width::UnicodeWidthStr;

use spolist_api::model::OWN_PLAYLISTS_SENTINEL;

use crate::screen::ResultsList;
use crate::theme::{
    style_default, style_muted, style_secondary, style_selected, C_ACCENT, C_BADGE_PENDING,
    C_NUMBER_HINT,
};
use crate::widgets::paged_list::PagedList;
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::text::truncate;

pub fn draw(frame: &mut Frame, area: Rect, results: &ResultsList, typed: &str) {
    let title = if results.query == OWN_PLAYLISTS_SENTINEL {
        "your playlists".to_string()
    } else {
        format!("playlists: {}", results.query)
    };
    let title = truncate(&title, area.width.saturating_sub(16) as usize);
    let badge = results.pending.as_ref().map(|_| Badge {
        text: "LOADING DEVICES",
        color: C_BADGE_PENDING,
    });
    let block = pane_chrome(&title, badge);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if results.list.is_empty() {
        let msg = if results.query == OWN_PLAYLISTS_SENTINEL {
            "  no playlists in your library".to_string()
        } else {
            format!("  no results for '{}'", results.query)
        };
        frame.render_widget(Paragraph::new(Span::styled(msg, style_muted())), inner);
        return;
    }

    let width = inner.width as usize;
    let mut lines: Vec<Line> = results
        .list
        .page_items()
        .into_iter()
        .map(|(index, p)| {
            let selected = results.list.selected_index() == Some(index);
            let detail = format!(" ({} tracks) · {}", p.track_count, p.owner);
            row(index, &p.name, &detail, selected, width)
        })
        .collect();
    pad_to(&mut lines, inner.height.saturating_sub(1) as usize);
    lines.push(page_footer(&results.list, "playlists", typed, width));
    frame.render_widget(Paragraph::new(lines), inner);
}

/// One numbered list row: `▶  12. name detail`.
pub(crate) fn row<'a>(
    index: usize,
    name: &str,
    detail: &str,
    selected: bool,
    width: usize,
) -> Line<'a> {
    let marker = if selected { "▶" } else { " " };
    let number = format!("{} {:>3}. ", marker, index + 1);
    let room = width.saturating_sub(number.chars().count());
    let name = truncate(name, room);
    let detail = truncate(detail, room.saturating_sub(name.width()));

    let (name_style, number_style) = if selected {
        (style_selected(), Style::default().fg(C_ACCENT))
    } else {
        (style_default(), Style::default().fg(C_NUMBER_HINT))
    };
    Line::from(vec![
        Span::styled(number, number_style),
        Span::styled(name, name_style),
        Span::styled(detail, style_secondary()),
    ])
}

pub(crate) fn pad_to(lines: &mut Vec<Line>, height: usize) {
    while lines.len() < height {
        lines.push(Line::from(""));
    }
}

/// `page 2/3 · 23 playlists · go to #12`
pub(crate) fn page_footer<'a, T>(
    list: &PagedList<T>,
    noun: &str,
    typed: &str,
    width: usize,
) -> Line<'a> {
    let mut text = format!(
        " page {}/{} · {} {}",
        list.page() + 1,
        list.page_count().max(1),
        list.len(),
        noun
    );
    if !typed.is_empty() {
        text.push_str(&format!(" · go to #{}", typed));
    }
    Line::from(Span::styled(truncate(&text, width), style_muted()))
}
