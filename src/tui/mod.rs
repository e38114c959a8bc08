mod app;
mod canvas;
mod event;
mod view;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use log::{info, warn};
use ratatui::prelude::*;

use crate::ingest::{self, DataSource};
use crate::pipeline::Session;
use crate::watch;
use app::App;
use event::KeyAction;

pub fn run(source: &DataSource, session: Session, poll_interval: u64) -> Result<()> {
    let mut app = App::new(session);

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, source, poll_interval);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    source: &DataSource,
    poll_interval: u64,
) -> Result<()> {
    let poll_duration = Duration::from_millis(poll_interval);

    let (_watcher, rx) = watch::watch_file(&source.path)?;

    loop {
        terminal.draw(|frame| view::render(frame, app))?;

        if ct_event::poll(poll_duration)? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.error = None;
                    match event::handle_key(app, key) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::ToggleDone => {
                            if let Err(e) = app.toggle_selected() {
                                app.error = Some(format!("{e:#}"));
                            }
                        }
                        KeyAction::Continue => {}
                    }
                }
            }
        }

        // Check for file changes (non-blocking)
        if watch::wait_for_change(&rx, Duration::ZERO) {
            watch::drain_events(&rx);
            match ingest::load_path(&source.path) {
                Ok((_, rows)) => {
                    info!("reloaded {} rows from {}", rows.len(), source.path.display());
                    if let Err(e) = app.reload(rows) {
                        app.error = Some(format!("{e:#}"));
                    }
                }
                // Keep showing the last good data while the file is mid-edit.
                Err(e) => {
                    warn!("reload failed: {e:#}");
                    app.error = Some(format!("reload failed: {e:#}"));
                }
            }
        }
    }
}
