//! Plain-text rendering for CLI output.

use crate::fields::MilestoneStatus;
use crate::milestone::{Milestone, OverallProgress};

/// Format a milestone status for display.
pub fn format_status(s: MilestoneStatus) -> &'static str {
    match s {
        MilestoneStatus::Upcoming => "Upcoming",
        MilestoneStatus::InProgress => "In Progress",
        MilestoneStatus::Completed => "Completed",
    }
}

/// Truncate a string to fit within the specified width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// A text progress bar such as `[####------]`.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// One line per milestone, numbered from 1 to match `gp toggle`.
pub fn milestone_line(number: usize, m: &Milestone) -> String {
    let lock = if m.is_admin_locked() { " (locked)" } else { "" };
    format!(
        "{:>3}. {:<12} {:<11} {} {:>3}%  {}{}",
        number,
        truncate(&m.week_label, 12),
        format_status(m.display_status()),
        progress_bar(m.progress_percent(), 10),
        m.progress_percent(),
        m.title,
        lock
    )
}

/// Print milestones with their positions in the full timeline.
/// Tasks are listed unless `compact` is set.
pub fn print_timeline(entries: &[(usize, &Milestone)], compact: bool) {
    for &(index, m) in entries {
        println!("{}", milestone_line(index + 1, m));
        if compact {
            continue;
        }
        for (t, task) in m.tasks.iter().enumerate() {
            let mark = if m.shows_task_completed(task) { "x" } else { " " };
            println!("       {:>2}. [{}] {}", t + 1, mark, task.name);
        }
    }
}

/// Summary lines for overall progress.
pub fn progress_lines(p: &OverallProgress) -> Vec<String> {
    vec![
        format!("Overall progress: {} {}%", progress_bar(p.percent, 20), p.percent),
        format!("Tasks completed:  {}/{}", p.completed_tasks, p.total_tasks),
        format!("Milestones done:  {}/{}", p.completed_milestones, p.total_milestones),
    ]
}
