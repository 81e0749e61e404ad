use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::status::{LinkedIssue, OverallStatus};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_cell(status: OverallStatus) -> Cell {
    let color = match status {
        OverallStatus::Passing => TableColor::Green,
        OverallStatus::Failing => TableColor::Red,
        OverallStatus::Flaky => TableColor::Yellow,
    };
    Cell::new(status.as_str()).fg(color)
}

/// Untracked flaking tests stand out in red.
pub fn linked_count_cell(linked: usize, tests: usize) -> Cell {
    let text = format!("{linked}/{tests}");
    if tests == 0 || linked == tests {
        Cell::new(text).fg(TableColor::Green)
    } else if linked > 0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn linked_issues_cell(issues: &[LinkedIssue]) -> Cell {
    if issues.is_empty() {
        return Cell::new("none").fg(TableColor::Red);
    }
    let text = issues
        .iter()
        .map(|linked| format!("#{} {}", linked.issue.number, linked.issue.url))
        .collect::<Vec<_>>()
        .join("\n");
    Cell::new(text).fg(TableColor::Green)
}

pub fn days_ago_cell(days: Option<i64>) -> Cell {
    match days {
        None => Cell::new("never").fg(TableColor::DarkGrey),
        Some(0) => Cell::new("today").fg(TableColor::Green),
        Some(d) if d <= 2 => Cell::new(format!("{d}d ago")).fg(TableColor::Yellow),
        Some(d) => Cell::new(format!("{d}d ago")).fg(TableColor::Red),
    }
}
