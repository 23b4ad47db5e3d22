//! Interactive TUI
//!
//! One tab per simulation. Simulations keep running while another tab is
//! shown; leaving the TUI drops the app and with it every engine, which
//! cancels their pending timers.

use crossterm::event::{self, Event};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

use agentic_sim_core::analytics::SharedSink;
use agentic_sim_core::{error_log, info_log, Config};

pub mod app;
pub mod draw;
pub mod event_loop;

use crate::tui::app::App;
use crate::tui::event_loop::{handle_key_event, LoopAction};

/// Main entry point for the TUI
pub async fn run_tui(config: &Config, analytics: SharedSink) -> anyhow::Result<()> {
    let mut app = App::new(config, analytics)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match &result {
        Ok(()) => info_log!("tui closed"),
        Err(e) => error_log!("tui event loop failed: {}", e),
    }
    result.map_err(Into::into)
}

/// Main event loop
async fn run_event_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(50);

    loop {
        terminal.draw(|f| draw::draw_ui(f, app))?;

        // Sleep on the runtime so engine tasks keep advancing between frames
        tokio::time::sleep(tick_rate).await;

        while event::poll(Duration::from_secs(0))? {
            match event::read()? {
                Event::Key(key) => match handle_key_event(app, key) {
                    LoopAction::Continue => {}
                    LoopAction::Break => return Ok(()),
                },
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
