//! Event Loop Module
//!
//! Handles keyboard events for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use agentic_sim_core::sims::Decision;

use crate::tui::app::App;

/// Handle key events
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> LoopAction {
    if key.kind == KeyEventKind::Release {
        return LoopAction::Continue;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return LoopAction::Break;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.should_quit = true;
            LoopAction::Break
        }
        KeyCode::Tab | KeyCode::Right => {
            app.next_tab();
            LoopAction::Continue
        }
        KeyCode::BackTab | KeyCode::Left => {
            app.prev_tab();
            LoopAction::Continue
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            app.start_selected();
            LoopAction::Continue
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.reset_selected();
            LoopAction::Continue
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.decide(Decision::Approve);
            LoopAction::Continue
        }
        KeyCode::Char('n') | KeyCode::Char('N') => {
            app.decide(Decision::Reject);
            LoopAction::Continue
        }
        _ => LoopAction::Continue,
    }
}

/// What the main loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue the event loop
    Continue,
    /// Break out of the event loop
    Break,
}
