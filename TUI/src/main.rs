mod action;
mod app;
mod backend;
mod command;
mod config;
mod effect;
mod error;
mod logging;
mod plot;
mod point_store;
mod render;
mod runtime;
mod selection;
mod session;
mod similarity;
mod submission;
mod ui;
mod ui_state;

use std::io;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use app::App;
use config::Cli;
use ui::draw;
use ui_state::Focus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config();
    let _log_guard = logging::init(&config)?;
    info!(api_url = %config.api_url, "starting embedviz");

    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let mut app = App::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start();

    // The event poll blocks; request tasks run on the worker threads
    let result = tokio::task::block_in_place(|| run_app(&mut terminal, &mut app, tick_rate));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %e, "terminal loop failed");
    }
    info!("exiting");
    result.map_err(Into::into)
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> io::Result<()> {
    while !app.should_quit {
        app.pump();
        app.tick();

        terminal.draw(|frame| draw(frame, app))?;

        if !event::poll(tick_rate)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
            Event::Paste(text) => {
                if app.ui.focus == Focus::Input {
                    app.paste(&text);
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => app.click_at(mouse.column, mouse.row),
                MouseEventKind::Moved => app.hover_at(mouse.column, mouse.row),
                _ => {}
            },
            _ => {}
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Overlays swallow keys until dismissed
    if app.ui.confirm_reset {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_reset(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_reset(false),
            _ => {}
        }
        return;
    }
    if app.ui.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.ui.show_help = false;
        }
        return;
    }

    match app.ui.focus {
        Focus::Chart => match key.code {
            KeyCode::Tab | KeyCode::BackTab => app.cycle_focus(),
            KeyCode::Left | KeyCode::Up => app.move_cursor(false),
            KeyCode::Right | KeyCode::Down => app.move_cursor(true),
            KeyCode::Char(' ') | KeyCode::Enter => app.toggle_cursor(),
            KeyCode::Char('d') => app.perform(action::Action::Deselect),
            KeyCode::Char('r') => app.perform(action::Action::Refresh),
            KeyCode::Char('?') => app.perform(action::Action::Help),
            KeyCode::Esc => app.cycle_focus(),
            _ => {}
        },
        Focus::Input => match key.code {
            KeyCode::Esc => {
                if app.showing_command_popup() && app.ui.command_selection.is_some() {
                    app.reset_command_selection();
                } else if app.ui.input.is_empty() {
                    app.should_quit = true;
                } else {
                    app.ui.input.clear();
                    app.reset_command_selection();
                }
            }
            KeyCode::Enter => {
                if app.showing_command_popup() && app.ui.command_selection.is_some() {
                    app.apply_command_selection();
                } else {
                    app.submit_input();
                }
            }
            KeyCode::Tab => {
                if app.showing_command_popup() && app.ui.command_selection.is_some() {
                    // Tab applies command selection when popup is showing
                    app.apply_command_selection();
                } else {
                    app.cycle_focus();
                }
            }
            KeyCode::BackTab => app.cycle_focus(),
            KeyCode::Backspace => app.backspace(),
            KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.paste_clipboard();
            }
            KeyCode::Char(c) => app.push_char(c),
            KeyCode::Up => app.command_select_up(),
            KeyCode::Down => app.command_select_down(),
            _ => {}
        },
    }
}
