//! Frame layout: header | body | banner | keys bar, with the help popup on
//! top. Drawing reads state only.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::components::{device_list, help_overlay, playback, results_list, search_prompt};
use crate::keymap::{Dispatcher, KeyMap};
use crate::screen::{Navigator, Screen};
use crate::theme::{style_accent, style_error, style_muted};
use crate::widgets::status_bar;

pub const MIN_WIDTH: u16 = 40;
pub const MIN_HEIGHT: u16 = 10;

pub fn fits(width: u16, height: u16) -> bool {
    width >= MIN_WIDTH && height >= MIN_HEIGHT
}

pub fn draw(frame: &mut Frame, nav: &Navigator, dispatcher: &Dispatcher) {
    let area = frame.area();
    if !fits(area.width, area.height) {
        draw_too_small(frame, area, dispatcher.keys());
        return;
    }

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(" spolist", style_accent()),
            Span::styled(" · spotify playlist player", style_muted()),
        ])),
        outer[0],
    );

    let typed = dispatcher.pending_number();
    match nav.screen() {
        Screen::Popup(popup) => {
            draw_screen(frame, outer[1], &popup.ret, typed, false);
            help_overlay::draw(frame, area, popup.ret.kind(), dispatcher.keys());
        }
        screen => draw_screen(frame, outer[1], screen, typed, true),
    }

    status_bar::draw_banner(frame, outer[2], nav.banner());
    status_bar::draw_keys_bar(frame, outer[3], nav.kind(), dispatcher.keys());
}

fn draw_screen(frame: &mut Frame, area: Rect, screen: &Screen, typed: &str, focused: bool) {
    match screen {
        Screen::SearchPrompt(prompt) => search_prompt::draw(frame, area, prompt, focused),
        Screen::ResultsList(results) => results_list::draw(frame, area, results, typed),
        Screen::DeviceList(devices) => device_list::draw(frame, area, devices, typed),
        Screen::Playback(view) => playback::draw(frame, area, view),
        // Popups never nest.
        Screen::Popup(_) => {}
    }
}

fn draw_too_small(frame: &mut Frame, area: Rect, keys: &KeyMap) {
    let lines = vec![
        Line::from(Span::styled("terminal too small", style_error())),
        Line::from(Span::styled(
            format!(
                "{}x{}, need {}x{}",
                area.width, area.height, MIN_WIDTH, MIN_HEIGHT
            ),
            style_muted(),
        )),
        Line::from(Span::styled(
            format!("{} quit", KeyMap::label(&keys.quit)),
            style_muted(),
        )),
    ];
    let top = area.height.saturating_sub(lines.len() as u16) / 2;
    let body = Rect {
        y: area.y + top,
        height: area.height - top,
        ..area
    };
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        body,
    );
}
