//! Track progress bar with elapsed/total labels.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_PAUSED, C_PLAYING, C_SECONDARY};
use crate::widgets::text::fmt_duration;

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Bar of `width` cells filled to `progress` (0.0..=1.0) in eighths.
fn bar(progress: f64, width: usize) -> String {
    let eighths = (progress.clamp(0.0, 1.0) * width as f64 * 8.0) as usize;
    let full = eighths / 8;
    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat('█').take(full.min(width)));
    if full < width {
        out.push(BLOCKS[eighths % 8]);
        out.extend(std::iter::repeat(' ').take(width - full - 1));
    }
    out
}

pub fn draw_progress(frame: &mut Frame, area: Rect, position_ms: u64, duration_ms: u64, playing: bool) {
    if area.width < 4 || area.height == 0 {
        return;
    }
    let position_ms = if duration_ms > 0 {
        position_ms.min(duration_ms)
    } else {
        position_ms
    };
    let left = fmt_duration(position_ms);
    let right = fmt_duration(duration_ms);
    let label_w = (left.len() + right.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;
    let progress = if duration_ms == 0 {
        0.0
    } else {
        position_ms as f64 / duration_ms as f64
    };
    let color = if playing { C_PLAYING } else { C_PAUSED };

    let line = Line::from(vec![
        Span::styled(format!("{} ", left), Style::default().fg(C_SECONDARY)),
        Span::styled(bar(progress, bar_w), Style::default().fg(color)),
        Span::styled(format!(" {}", right), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
