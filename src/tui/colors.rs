//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::MilestoneStatus;

/// Progress gauge and the celebration banner background
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Milestones in progress and the celebration heading
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Status bar background for errors
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Table header and status bar background
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);

/// Foreground color for a displayed status.
pub fn status_color(status: MilestoneStatus) -> Color {
    match status {
        MilestoneStatus::Upcoming => Color::Gray,
        MilestoneStatus::InProgress => GOLD,
        MilestoneStatus::Completed => Color::Green,
    }
}
