//! Main application logic for the timeline view.
//!
//! `TimelineApp` hosts the progress controller: it forwards task toggles to
//! the [`Timeline`](crate::timeline::Timeline), hands sync requests to a
//! background worker, feeds results back on every tick, and turns the
//! controller's effects into a celebration banner and delayed scrolling.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, Gauge, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
    },
    Frame, Terminal,
};
use tracing::debug;

use crate::api::TimelineBackend;
use crate::display::{format_status, truncate};
use crate::fields::MilestoneStatus;
use crate::milestone::OverallProgress;
use crate::session::Session;
use crate::sync::SyncWorker;
use crate::timeline::{Effect, StartedToggle, SyncOutcome, TimelineError, ToggleOutcome};
use crate::tui::{
    colors::{status_color, DARK_GREEN, DARK_PURPLE, DARK_RED, GOLD},
    enums::{AppState, Focus},
    utils::centered_rect,
};

/// A celebration banner and when it should disappear.
struct Celebration {
    title: String,
    until: Instant,
    /// The toggle that raised it.
    toggle: u64,
}

/// A milestone to bring into view once its deadline passes.
struct PendingScroll {
    at: Instant,
    index: usize,
    toggle: u64,
}

/// Main application state for the timeline view.
pub struct TimelineApp<B: TimelineBackend + Send + Sync + 'static> {
    state: AppState,
    focus: Focus,
    session: Session<Arc<B>>,
    worker: SyncWorker,
    milestone_state: TableState,
    task_state: ListState,
    status_message: String,
    status_is_error: bool,
    celebration: Option<Celebration>,
    celebration_for: Duration,
    pending_scrolls: Vec<PendingScroll>,
    /// Number of the most recently dispatched toggle.
    toggle_seq: u64,
}

impl<B: TimelineBackend + Send + Sync + 'static> TimelineApp<B> {
    /// Create the app around an already mounted session.
    pub fn new(session: Session<Arc<B>>, celebration_for: Duration) -> Self {
        let worker = SyncWorker::spawn(Arc::clone(session.backend()));
        let mut app = TimelineApp {
            state: AppState::Timeline,
            focus: Focus::Milestones,
            session,
            worker,
            milestone_state: TableState::default(),
            task_state: ListState::default(),
            status_message: String::new(),
            status_is_error: false,
            celebration: None,
            celebration_for,
            pending_scrolls: Vec::new(),
            toggle_seq: 0,
        };
        app.after_load();
        app
    }

    /// Reset selection and surface any load error after (re)loading.
    fn after_load(&mut self) {
        let count = self.session.timeline().milestones().len();
        let first_open = self
            .session
            .timeline()
            .milestones()
            .iter()
            .position(|m| m.display_status() != MilestoneStatus::Completed);
        self.milestone_state
            .select(if count == 0 { None } else { Some(first_open.unwrap_or(count - 1)) });
        self.reset_task_selection();

        if let Some(e) = self.session.load_error() {
            let msg = format!("Could not load your timeline: {e}. Press 'r' to try again.");
            self.set_error_message(msg);
        }
    }

    fn reset_task_selection(&mut self) {
        let has_tasks = self
            .selected_milestone()
            .and_then(|i| self.session.timeline().milestones().get(i))
            .is_some_and(|m| !m.tasks.is_empty());
        self.task_state.select(if has_tasks { Some(0) } else { None });
    }

    fn selected_milestone(&self) -> Option<usize> {
        self.milestone_state.selected()
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
        self.status_is_error = false;
    }

    fn set_error_message(&mut self, msg: String) {
        self.status_message = msg;
        self.status_is_error = true;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
        self.status_is_error = false;
    }

    /// Move the selection in the focused pane by `delta`, clamped.
    fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Focus::Milestones => {
                let len = self.session.timeline().milestones().len();
                if let Some(next) = step(self.milestone_state.selected(), delta, len) {
                    self.milestone_state.select(Some(next));
                    self.reset_task_selection();
                }
            }
            Focus::Tasks => {
                let len = self
                    .selected_milestone()
                    .and_then(|i| self.session.timeline().milestones().get(i))
                    .map_or(0, |m| m.tasks.len());
                if let Some(next) = step(self.task_state.selected(), delta, len) {
                    self.task_state.select(Some(next));
                }
            }
        }
    }

    /// Toggle the selected task through the progress controller.
    fn toggle_selected(&mut self, now: Instant) {
        let (Some(mi), Some(ti)) = (self.selected_milestone(), self.task_state.selected()) else {
            return;
        };
        match self.session.timeline_mut().toggle_task(mi, ti) {
            Ok(ToggleOutcome::Started(started)) => self.dispatch(started, now),
            Ok(ToggleOutcome::Queued) => self.set_status_message(
                "Saving... (another change is still in progress)".to_string(),
            ),
            Err(TimelineError::AdminLocked) => self.set_status_message(
                "This milestone was signed off by an administrator and cannot be changed."
                    .to_string(),
            ),
            // Not signed in: toggles do nothing.
            Err(e) => debug!(error = %e, "toggle ignored"),
        }
    }

    /// Show a toggle's effects and send its request to the worker.
    fn dispatch(&mut self, started: StartedToggle, now: Instant) {
        let StartedToggle { request, effects } = started;
        self.toggle_seq += 1;
        self.apply_effects(effects, now);
        if let Err(e) = self.worker.dispatch(request) {
            let settlement = self.session.timeline_mut().settle(Err(e));
            self.handle_outcome(settlement.outcome);
            if let Some(next) = settlement.next {
                self.dispatch(next, now);
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>, now: Instant) {
        for effect in effects {
            match effect {
                Effect::Celebrate { title, .. } => {
                    self.celebration = Some(Celebration {
                        title,
                        until: now + self.celebration_for,
                        toggle: self.toggle_seq,
                    });
                }
                Effect::ScrollTo {
                    milestone_index,
                    after,
                } => {
                    self.pending_scrolls.push(PendingScroll {
                        at: now + after,
                        index: milestone_index,
                        toggle: self.toggle_seq,
                    });
                }
            }
        }
    }

    fn handle_outcome(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::RolledBack(e) => {
                self.set_error_message(format!(
                    "Could not save your change ({e}). It has been undone."
                ));
                // Only the failed toggle's effects go; it is always the latest one.
                let failed = self.toggle_seq;
                if self.celebration.as_ref().is_some_and(|c| c.toggle == failed) {
                    self.celebration = None;
                }
                self.pending_scrolls.retain(|s| s.toggle != failed);
            }
            SyncOutcome::Confirmed | SyncOutcome::Idle => {}
        }
    }

    /// Feed finished sync results back into the controller.
    pub fn poll_sync(&mut self, now: Instant) {
        while let Some(result) = self.worker.try_result() {
            let settlement = self.session.timeline_mut().settle(result);
            self.handle_outcome(settlement.outcome);
            if let Some(next) = settlement.next {
                self.dispatch(next, now);
            }
        }
    }

    /// Run due scrolls and expire the celebration banner.
    pub fn tick(&mut self, now: Instant) {
        let len = self.session.timeline().milestones().len();
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending_scrolls.drain(..).partition(|s| s.at <= now);
        self.pending_scrolls = waiting;
        for scroll in due {
            if scroll.index < len {
                self.milestone_state.select(Some(scroll.index));
                self.reset_task_selection();
            }
        }

        if self.celebration.as_ref().is_some_and(|c| c.until <= now) {
            self.celebration = None;
        }
    }

    fn reload(&mut self) {
        if self.session.timeline().is_syncing() {
            self.set_status_message("Still saving; try again in a moment.".to_string());
            return;
        }
        self.session.reload();
        self.pending_scrolls.clear();
        self.celebration = None;
        self.after_load();
        if self.session.load_error().is_none() {
            self.set_status_message("Timeline refreshed.".to_string());
        }
    }

    /// Handle a key press in the timeline view. Returns true to quit.
    fn handle_timeline_input(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
        now: Instant,
    ) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                self.focus = self.focus.other();
            }
            KeyCode::Enter if self.focus == Focus::Milestones => self.focus = Focus::Tasks,
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('c') => {
                if self.focus == Focus::Tasks {
                    self.toggle_selected(now);
                }
            }
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    /// Handle a key press for the current state. Returns true to quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers, now: Instant) -> bool {
        match self.state {
            AppState::Timeline => {
                self.clear_status_message();
                self.handle_timeline_input(key, modifiers, now)
            }
            AppState::Help => {
                self.state = AppState::Timeline;
                false
            }
        }
    }

    /// Poll for and handle keyboard events.
    ///
    /// Returns true if the application should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers, Instant::now()));
                }
            }
        }
        Ok(false)
    }

    /// Render the header with the student's name and overall progress.
    fn render_header(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let name = self
            .session
            .user()
            .map(|u| u.display_name())
            .unwrap_or_else(|| "Not signed in".to_string());
        let header = Paragraph::new(Line::from(vec![
            Span::styled("GRADUATE TIMELINE", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(name, Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC)),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(header, chunks[0]);

        let progress = OverallProgress::from_milestones(self.session.timeline().milestones());
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Overall progress"))
            .gauge_style(Style::default().fg(DARK_GREEN).bg(Color::Black))
            .percent(u16::from(progress.percent))
            .label(format!(
                "{}% | {}/{} tasks | {}/{} milestones",
                progress.percent,
                progress.completed_tasks,
                progress.total_tasks,
                progress.completed_milestones,
                progress.total_milestones
            ));
        f.render_widget(gauge, chunks[1]);
    }

    fn pane_block(&self, title: String, pane: Focus) -> Block<'static> {
        let border = if self.focus == pane {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        Block::default().borders(Borders::ALL).border_style(border).title(title)
    }

    /// Render the milestone table.
    fn render_milestones(&mut self, f: &mut Frame, area: Rect) {
        let milestones = self.session.timeline().milestones();
        let block = self.pane_block(
            format!("Milestones ({}) - Press 'h' for help", milestones.len()),
            Focus::Milestones,
        );

        if milestones.is_empty() {
            let text = match self.session.load_error() {
                Some(e) => Line::from(Span::styled(
                    format!("Could not load your timeline: {e}"),
                    Style::default().fg(Color::Red),
                )),
                None if self.session.user().is_none() => {
                    Line::from("Not signed in. Run `gp token set <token>` first.")
                }
                None => Line::from("No milestones have been set up yet."),
            };
            f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
            return;
        }

        let header = Row::new(["Week", "Status", "Done", "Milestone"].map(|h| {
            Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .style(Style::default().bg(DARK_PURPLE).fg(Color::White))
        .height(1);

        let rows: Vec<Row> = milestones
            .iter()
            .map(|m| {
                let status = m.display_status();
                let status_text = if m.is_admin_locked() {
                    format!("{} *", format_status(status))
                } else {
                    format_status(status).to_string()
                };
                let style = if m.is_admin_locked() {
                    Style::default().fg(Color::Magenta)
                } else if status == MilestoneStatus::InProgress {
                    Style::default().fg(status_color(status)).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(status_color(status))
                };
                Row::new(vec![
                    Cell::from(truncate(&m.week_label, 10)),
                    Cell::from(status_text),
                    Cell::from(format!("{}/{}", m.displayed_completed_count(), m.tasks.len())),
                    Cell::from(m.title.clone()),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(10), // Week
            Constraint::Length(13), // Status
            Constraint::Length(6),  // Done
            Constraint::Min(20),    // Title
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.milestone_state);
    }

    /// Render the task checklist for the selected milestone.
    fn render_tasks(&mut self, f: &mut Frame, area: Rect) {
        let milestone = self
            .milestone_state
            .selected()
            .and_then(|i| self.session.timeline().milestones().get(i));

        let Some(m) = milestone else {
            let block = self.pane_block("Tasks".to_string(), Focus::Tasks);
            f.render_widget(Paragraph::new("Select a milestone.").block(block), area);
            return;
        };

        let title = if m.is_admin_locked() {
            format!("{} - signed off by an administrator", m.title)
        } else {
            format!("{} ({}%)", m.title, m.progress_percent())
        };
        let block = self.pane_block(title, Focus::Tasks);

        if m.tasks.is_empty() {
            f.render_widget(Paragraph::new("No tasks in this milestone.").block(block), area);
            return;
        }

        let items: Vec<ListItem> = m
            .tasks
            .iter()
            .map(|t| {
                let done = m.shows_task_completed(t);
                let (mark, style) = if done {
                    (
                        "[x]",
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT),
                    )
                } else {
                    ("[ ]", Style::default().fg(Color::White))
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{mark} ")),
                    Span::styled(t.name.clone(), style),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol("► ");

        f.render_stateful_widget(list, area, &mut self.task_state);
    }

    /// Render the celebration banner over the timeline.
    fn render_celebration(&self, f: &mut Frame, area: Rect) {
        let Some(celebration) = &self.celebration else {
            return;
        };
        let area = centered_rect(50, 40, area);
        f.render_widget(Clear, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Milestone completed!",
                Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(celebration.title.clone()),
        ];
        let banner = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Congratulations"))
            .style(Style::default().bg(DARK_GREEN).fg(Color::White))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(banner, area);
    }

    /// Render the help screen.
    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from(vec![Span::styled(
                "Graduate Timeline Help",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("  ↑/↓, k/j     Move within the focused pane"),
            Line::from("  Tab, ←/→     Switch between milestones and tasks"),
            Line::from("  Enter        Open the selected milestone's tasks"),
            Line::from("  Space/Enter/c  Tick or untick the selected task"),
            Line::from("  r            Reload the timeline"),
            Line::from("  h/F1         Show this help"),
            Line::from("  q/Ctrl+C/Esc Quit"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Milestone status:",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from("  Upcoming     No tasks ticked yet"),
            Line::from("  In Progress  Some tasks ticked"),
            Line::from("  Completed    Every task ticked; the next milestone opens"),
            Line::from("  Completed *  Signed off by an administrator (read-only)"),
            Line::from(""),
            Line::from("Changes show at once and are undone if they cannot be saved."),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help - Press any key to return"),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
    }

    /// Render the status bar at the bottom of the screen.
    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, bg) = if !self.status_message.is_empty() {
            let bg = if self.status_is_error { DARK_RED } else { DARK_PURPLE };
            (self.status_message.clone(), bg)
        } else if self.session.timeline().is_syncing() {
            let queued = self.session.timeline().queued_len();
            let text = if queued > 0 {
                format!("Saving... ({queued} more queued)")
            } else {
                "Saving...".to_string()
            };
            (text, DARK_PURPLE)
        } else {
            let hint = match self.focus {
                Focus::Milestones => "Enter: open tasks | Tab: switch pane | r: reload | h: help",
                Focus::Tasks => "Space: tick task | Tab: switch pane | r: reload | h: help",
            };
            (hint.to_string(), DARK_PURPLE)
        };

        let status = Paragraph::new(text)
            .style(Style::default().bg(bg).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main render function that dispatches to appropriate view renderers.
    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Panes
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        match self.state {
            AppState::Timeline => {
                self.render_header(f, chunks[0]);
                let panes = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                    .split(chunks[1]);
                self.render_milestones(f, panes[0]);
                self.render_tasks(f, panes[1]);
                self.render_celebration(f, chunks[1]);
            }
            AppState::Help => {
                let area = Rect { height: chunks[0].height + chunks[1].height, ..chunks[0] };
                self.render_help(f, area);
            }
        }

        self.render_status_bar(f, chunks[2]);
    }

    /// Main event loop for the timeline view.
    ///
    /// Polls sync results and timers, renders, and handles input until the user exits.
    pub fn run<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> io::Result<()> {
        loop {
            let now = Instant::now();
            self.poll_sync(now);
            self.tick(now);
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Step an optional index by `delta` within `0..len`.
fn step(current: Option<usize>, delta: isize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let next = match current {
        Some(i) => i.saturating_add_signed(delta).min(len - 1),
        None => 0,
    };
    Some(next)
}
