//! Timeline TUI entry point and setup.

use std::io;
use std::sync::Arc;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tracing::info;

use crate::cmd::Context;
use crate::session::Session;
use crate::tui::app::TimelineApp;

/// Load the timeline, then run the terminal user interface until the user quits.
pub fn run_tui(ctx: &Context) -> io::Result<()> {
    info!(api_url = %ctx.api_url, "starting timeline view");
    // Mount before touching the terminal; a failed load shows inline in the view.
    let session = Session::mount(Arc::new(ctx.backend()), ctx.timeline());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = TimelineApp::new(session, ctx.config.celebration());
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
