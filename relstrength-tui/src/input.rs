//! Keyboard input → actions. The main loop decides what each action does.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use relstrength_core::Toggle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Toggle(Toggle),
    Reload,
    Quit,
}

pub fn action_for(key: KeyEvent) -> Option<Action> {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('f') => Some(Action::Toggle(Toggle::Factors)),
        KeyCode::Char('s') => Some(Action::Toggle(Toggle::StrongOnly)),
        KeyCode::Char('r') => Some(Action::Reload),
        _ => None,
    }
}

/// Key hints for the status bar.
pub const HINTS: &str = " f:factors  s:strong only  r:reload  q:quit ";
