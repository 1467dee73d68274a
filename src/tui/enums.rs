//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    Timeline,
    Help,
}

/// Which pane receives navigation and toggle keys.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Focus {
    Milestones,
    Tasks,
}

impl Focus {
    pub fn other(self) -> Self {
        match self {
            Focus::Milestones => Focus::Tasks,
            Focus::Tasks => Focus::Milestones,
        }
    }
}
