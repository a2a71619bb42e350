//! Key table and per-screen input dispatch.
//!
//! Bindings come from `[keys]` in the config file as key names (`"enter"`,
//! `"p"`, `"ctrl+c"`, …). The dispatcher maps a key event to at most one
//! `Action` given the active screen, and owns the pending numeric-selection
//! buffer for list screens.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use thiserror::Error;
use tracing::warn;

use spolist_api::config::KeyConfig;

use crate::action::{Action, ScreenKind, TransportAction};

#[derive(Debug, Error, PartialEq)]
#[error("unknown key name '{0}'")]
pub struct UnknownKey(pub String);

/// One key plus the modifiers that must accompany it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    code: KeyCode,
    ctrl: bool,
    alt: bool,
}

impl KeyBinding {
    pub fn parse(name: &str) -> Result<Self, UnknownKey> {
        let lowered = name.trim().to_ascii_lowercase();
        let mut ctrl = false;
        let mut alt = false;
        let mut rest = lowered.as_str();
        loop {
            if let Some(r) = rest.strip_prefix("ctrl+") {
                ctrl = true;
                rest = r;
            } else if let Some(r) = rest.strip_prefix("alt+") {
                alt = true;
                rest = r;
            } else {
                break;
            }
        }

        let code = match rest {
            "enter" | "return" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "space" => KeyCode::Char(' '),
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            f if f.len() > 1 && f.starts_with('f') => match f[1..].parse::<u8>() {
                Ok(n) if (1..=12).contains(&n) => KeyCode::F(n),
                _ => return Err(UnknownKey(name.to_string())),
            },
            _ => {
                let mut chars = rest.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return Err(UnknownKey(name.to_string())),
                }
            }
        };
        Ok(Self { code, ctrl, alt })
    }

    /// Letters match regardless of case; Shift is ignored so that `?` and
    /// `S` work on every terminal.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        if self.ctrl != key.modifiers.contains(KeyModifiers::CONTROL)
            || self.alt != key.modifiers.contains(KeyModifiers::ALT)
        {
            return false;
        }
        match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        }
    }

    /// A plain printable character: typed into text fields rather than bound.
    pub fn is_printable(&self) -> bool {
        matches!(self.code, KeyCode::Char(_)) && !self.ctrl && !self.alt
    }

    pub fn label(&self) -> String {
        let key = match self.code {
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Up => "↑".to_string(),
            KeyCode::Down => "↓".to_string(),
            KeyCode::Left => "←".to_string(),
            KeyCode::Right => "→".to_string(),
            KeyCode::F(n) => format!("F{}", n),
            other => format!("{:?}", other),
        };
        match (self.ctrl, self.alt) {
            (true, _) => format!("Ctrl+{}", key),
            (_, true) => format!("Alt+{}", key),
            _ => key,
        }
    }
}

/// Parsed key table. Unknown names are logged and skipped.
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub play_pause: Vec<KeyBinding>,
    pub next_track: Vec<KeyBinding>,
    pub prev_track: Vec<KeyBinding>,
    pub volume_up: Vec<KeyBinding>,
    pub volume_down: Vec<KeyBinding>,
    pub shuffle: Vec<KeyBinding>,
    pub back: Vec<KeyBinding>,
    pub quit: Vec<KeyBinding>,
    pub help: Vec<KeyBinding>,
    pub next_page: Vec<KeyBinding>,
    pub prev_page: Vec<KeyBinding>,
    pub select_down: Vec<KeyBinding>,
    pub select_up: Vec<KeyBinding>,
}

fn parse_all(field: &str, names: &[String]) -> Vec<KeyBinding> {
    names
        .iter()
        .filter_map(|name| match KeyBinding::parse(name) {
            Ok(b) => Some(b),
            Err(e) => {
                warn!("[keys] {}: {}", field, e);
                None
            }
        })
        .collect()
}

fn any(bindings: &[KeyBinding], key: &KeyEvent) -> bool {
    bindings.iter().any(|b| b.matches(key))
}

impl KeyMap {
    pub fn from_config(keys: &KeyConfig) -> Self {
        Self {
            play_pause: parse_all("play_pause", &keys.play_pause),
            next_track: parse_all("next_track", &keys.next_track),
            prev_track: parse_all("prev_track", &keys.prev_track),
            volume_up: parse_all("volume_up", &keys.volume_up),
            volume_down: parse_all("volume_down", &keys.volume_down),
            shuffle: parse_all("shuffle", &keys.shuffle),
            back: parse_all("back", &keys.back),
            quit: parse_all("quit", &keys.quit),
            help: parse_all("help", &keys.help),
            next_page: parse_all("next_page", &keys.next_page),
            prev_page: parse_all("prev_page", &keys.prev_page),
            select_down: parse_all("select_down", &keys.select_down),
            select_up: parse_all("select_up", &keys.select_up),
        }
    }

    /// "a / b" label for help text and the keys bar.
    pub fn label(bindings: &[KeyBinding]) -> String {
        bindings
            .iter()
            .map(KeyBinding::label)
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::from_config(&KeyConfig::default())
    }
}

/// Upper bound on typed digits; longer input cannot name a listed row.
const MAX_DIGITS: usize = 6;

/// Maps raw key events to per-screen actions.
pub struct Dispatcher {
    keys: KeyMap,
    digits: String,
}

impl Dispatcher {
    pub fn new(keys: KeyMap) -> Self {
        Self {
            keys,
            digits: String::new(),
        }
    }

    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    /// Digits typed so far on a list screen.
    pub fn pending_number(&self) -> &str {
        &self.digits
    }

    /// Drop the numeric buffer (called on every screen change).
    pub fn reset(&mut self) {
        self.digits.clear();
    }

    /// Returns `None` for keys with no meaning on `screen`; those never
    /// change state.
    pub fn dispatch(&mut self, screen: ScreenKind, key: KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        match screen {
            ScreenKind::Popup => Some(Action::DismissPopup),
            ScreenKind::SearchPrompt => self.search_prompt(key),
            ScreenKind::ResultsList | ScreenKind::DeviceList => self.list(key),
            ScreenKind::Playback => self.playback(key),
        }
    }

    /// Quit and cancel are honoured even when the terminal is too small to
    /// draw anything else.
    pub fn dispatch_minimal(&mut self, key: KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        (any(&self.keys.quit, &key) || any(&self.keys.back, &key)).then_some(Action::Quit)
    }

    fn search_prompt(&mut self, key: KeyEvent) -> Option<Action> {
        // Printable characters belong to the query.
        let bound = |bindings: &[KeyBinding]| {
            bindings.iter().any(|b| !b.is_printable() && b.matches(&key))
        };
        if key.code == KeyCode::Enter {
            return Some(Action::Submit);
        }
        if bound(&self.keys.quit) {
            return Some(Action::Quit);
        }
        if bound(&self.keys.back) {
            return Some(Action::Back);
        }
        if bound(&self.keys.help) {
            return Some(Action::Help);
        }
        Some(Action::Input(key))
    }

    fn list(&mut self, key: KeyEvent) -> Option<Action> {
        if let KeyCode::Char(c) = key.code {
            if c.is_ascii_digit() && key.modifiers.difference(KeyModifiers::SHIFT).is_empty() {
                if self.digits.len() < MAX_DIGITS {
                    self.digits.push(c);
                }
                return None;
            }
        }
        if key.code == KeyCode::Backspace && !self.digits.is_empty() {
            self.digits.pop();
            return None;
        }
        if key.code == KeyCode::Enter {
            let typed = std::mem::take(&mut self.digits);
            return match typed.parse::<usize>() {
                Ok(n) => Some(Action::JumpTo(n)),
                Err(_) => Some(Action::Select),
            };
        }

        // Any other key abandons a half-typed number.
        self.digits.clear();
        let k = &self.keys;
        if any(&k.quit, &key) {
            Some(Action::Quit)
        } else if any(&k.back, &key) {
            Some(Action::Back)
        } else if any(&k.help, &key) {
            Some(Action::Help)
        } else if any(&k.select_up, &key) {
            Some(Action::SelectUp)
        } else if any(&k.select_down, &key) {
            Some(Action::SelectDown)
        } else if any(&k.next_page, &key) {
            Some(Action::NextPage)
        } else if any(&k.prev_page, &key) {
            Some(Action::PrevPage)
        } else {
            None
        }
    }

    fn playback(&mut self, key: KeyEvent) -> Option<Action> {
        let k = &self.keys;
        let transport = |a| Some(Action::Transport(a));
        if any(&k.quit, &key) {
            Some(Action::Quit)
        } else if any(&k.back, &key) {
            Some(Action::Back)
        } else if any(&k.help, &key) {
            Some(Action::Help)
        } else if any(&k.play_pause, &key) {
            transport(TransportAction::PlayPause)
        } else if any(&k.next_track, &key) {
            transport(TransportAction::Next)
        } else if any(&k.prev_track, &key) {
            transport(TransportAction::Previous)
        } else if any(&k.volume_up, &key) {
            transport(TransportAction::VolumeUp)
        } else if any(&k.volume_down, &key) {
            transport(TransportAction::VolumeDown)
        } else if any(&k.shuffle, &key) {
            transport(TransportAction::Shuffle)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        press(KeyCode::Char(c))
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(KeyMap::default())
    }

    #[test]
    fn test_parse_key_names() {
        let b = KeyBinding::parse("ctrl+c").unwrap();
        assert!(b.matches(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!b.matches(&ch('c')));
        assert_eq!(KeyBinding::parse("F1").unwrap().label(), "F1");
        assert_eq!(KeyBinding::parse("Enter").unwrap().label(), "Enter");
        assert!(KeyBinding::parse("hyper+x").is_err());
        assert!(KeyBinding::parse("f13").is_err());
    }

    #[test]
    fn test_letters_match_case_insensitively() {
        let b = KeyBinding::parse("s").unwrap();
        assert!(b.matches(&KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT)));
        let q = KeyBinding::parse("?").unwrap();
        assert!(q.matches(&KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT)));
    }

    #[test]
    fn test_playback_default_table() {
        let mut d = dispatcher();
        let s = ScreenKind::Playback;
        assert_eq!(
            d.dispatch(s, press(KeyCode::Enter)),
            Some(Action::Transport(TransportAction::PlayPause))
        );
        assert_eq!(
            d.dispatch(s, ch('p')),
            Some(Action::Transport(TransportAction::PlayPause))
        );
        assert_eq!(
            d.dispatch(s, press(KeyCode::Right)),
            Some(Action::Transport(TransportAction::Next))
        );
        assert_eq!(
            d.dispatch(s, ch('h')),
            Some(Action::Transport(TransportAction::Previous))
        );
        assert_eq!(
            d.dispatch(s, ch('k')),
            Some(Action::Transport(TransportAction::VolumeUp))
        );
        assert_eq!(
            d.dispatch(s, press(KeyCode::Down)),
            Some(Action::Transport(TransportAction::VolumeDown))
        );
        assert_eq!(
            d.dispatch(s, ch('s')),
            Some(Action::Transport(TransportAction::Shuffle))
        );
        assert_eq!(d.dispatch(s, ch('q')), Some(Action::Back));
        assert_eq!(d.dispatch(s, ch('x')), Some(Action::Quit));
        assert_eq!(d.dispatch(s, ch('?')), Some(Action::Help));
    }

    #[test]
    fn test_unrecognized_key_is_none() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch(ScreenKind::Playback, ch('z')), None);
        assert_eq!(d.dispatch(ScreenKind::ResultsList, ch('z')), None);
        assert_eq!(d.dispatch(ScreenKind::Playback, ch('7')), None);
    }

    #[test]
    fn test_search_prompt_types_bound_characters() {
        let mut d = dispatcher();
        let s = ScreenKind::SearchPrompt;
        assert_eq!(d.dispatch(s, ch('x')), Some(Action::Input(ch('x'))));
        assert_eq!(d.dispatch(s, ch('?')), Some(Action::Input(ch('?'))));
        assert_eq!(d.dispatch(s, ch('q')), Some(Action::Input(ch('q'))));
        assert_eq!(d.dispatch(s, press(KeyCode::Enter)), Some(Action::Submit));
        assert_eq!(d.dispatch(s, press(KeyCode::Esc)), Some(Action::Back));
        assert_eq!(d.dispatch(s, press(KeyCode::F(1))), Some(Action::Help));
        assert_eq!(
            d.dispatch(s, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_numeric_buffer_commits_on_enter() {
        let mut d = dispatcher();
        let s = ScreenKind::ResultsList;
        assert_eq!(d.dispatch(s, ch('1')), None);
        assert_eq!(d.dispatch(s, ch('2')), None);
        assert_eq!(d.pending_number(), "12");
        assert_eq!(d.dispatch(s, press(KeyCode::Enter)), Some(Action::JumpTo(12)));
        assert_eq!(d.pending_number(), "");
        assert_eq!(d.dispatch(s, press(KeyCode::Enter)), Some(Action::Select));
    }

    #[test]
    fn test_numeric_buffer_backspace_and_abandon() {
        let mut d = dispatcher();
        let s = ScreenKind::DeviceList;
        d.dispatch(s, ch('4'));
        d.dispatch(s, ch('5'));
        assert_eq!(d.dispatch(s, press(KeyCode::Backspace)), None);
        assert_eq!(d.pending_number(), "4");
        assert_eq!(d.dispatch(s, ch('j')), Some(Action::SelectDown));
        assert_eq!(d.pending_number(), "");
    }

    #[test]
    fn test_popup_consumes_any_key() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch(ScreenKind::Popup, ch('x')), Some(Action::DismissPopup));
        assert_eq!(
            d.dispatch(ScreenKind::Popup, press(KeyCode::Enter)),
            Some(Action::DismissPopup)
        );
    }

    #[test]
    fn test_release_events_ignored() {
        let mut d = dispatcher();
        let mut key = ch('x');
        key.kind = KeyEventKind::Release;
        assert_eq!(d.dispatch(ScreenKind::Playback, key), None);
    }

    #[test]
    fn test_custom_table_from_config() {
        let mut config = KeyConfig::default();
        config.shuffle = vec!["z".into(), "bogus-key".into()];
        let mut d = Dispatcher::new(KeyMap::from_config(&config));
        assert_eq!(d.keys().shuffle.len(), 1);
        assert_eq!(
            d.dispatch(ScreenKind::Playback, ch('z')),
            Some(Action::Transport(TransportAction::Shuffle))
        );
        assert_eq!(d.dispatch(ScreenKind::Playback, ch('s')), None);
    }
}
