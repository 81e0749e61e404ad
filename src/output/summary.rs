use std::fmt::Write;

use comfy_table::Cell;

use crate::flakes::LinkSummary;
use crate::status::{OverallStatus, StatusSnapshot};

use super::exports::job_days_ago;
use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{
    create_table, cyan_header, days_ago_cell, linked_count_cell, linked_issues_cell, status_cell,
};

/// Prints a human-readable summary of a linked snapshot to stdout.
///
/// Displays color-coded tables showing:
/// - Overview: dashboard, bucket sizes, reported flake counts
/// - Flaking Jobs: per job, how many failing tests have a linked issue
/// - Flaking Tests: every failing test of a flaking job with its sig and issues
/// - Failing Jobs: failing test counts and last run
/// - Skipped Issues: board issues that could not be linked, and why
pub fn print_summary(snapshot: &StatusSnapshot, links: &LinkSummary) {
    println!("{}", render_summary(snapshot, links));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

pub fn render_summary(snapshot: &StatusSnapshot, links: &LinkSummary) -> String {
    let mut output = String::new();
    let now = snapshot.collected_at;
    let flaking = snapshot.bucket(OverallStatus::Flaky);
    let failing = snapshot.bucket(OverallStatus::Failing);

    add_section_header(&mut output, "📊", "Overview");

    let skipped_display = if links.skipped.is_empty() {
        bright_green(links.skipped.len())
    } else {
        bright_red(links.skipped.len())
    };

    let _ = write!(
        output,
        "  {} {}\n  {} {} ({} reported by the summary)\n  {} {}  {} {}  {} {}\n  {} {} seen, {} linked, {} without matching tests, {} skipped\n  {} {}\n  {} {}\n\n",
        dim("Dashboard:"),
        cyan(&snapshot.name),
        dim("Jobs:"),
        bright_yellow(snapshot.job_count()),
        snapshot.total_jobs,
        dim("Flaking:"),
        bright_yellow(flaking.len()),
        dim("Failing:"),
        bright_red(failing.len()),
        dim("Passing:"),
        bright_green(snapshot.bucket(OverallStatus::Passing).len()),
        dim("Reported flakes:"),
        bright_yellow(links.issues_seen),
        bright_green(links.issues_linked),
        links.issues_unmatched,
        skipped_display,
        dim("Tests linked:"),
        bright_yellow(snapshot.linked_issue_count()),
        dim("Collected:"),
        dim(snapshot.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if flaking.is_empty() {
        let _ = writeln!(output, "{}\n", bright_green("No flaking jobs."));
    } else {
        add_section_header(&mut output, "❄️", "Flaking Jobs");

        let mut jobs_table = create_table();
        jobs_table.set_header(cyan_header(&["Job", "Status", "Linked Tests", "Last Run"]));
        for (job, status) in flaking {
            let linked = status
                .tests()
                .iter()
                .filter(|test| !test.linked_issues.is_empty())
                .count();
            jobs_table.add_row(vec![
                Cell::new(job),
                status_cell(status.overall_status),
                linked_count_cell(linked, status.tests().len()),
                days_ago_cell(job_days_ago(status, now)),
            ]);
        }
        let _ = writeln!(output, "{jobs_table}\n");

        add_section_header(&mut output, "🧪", "Flaking Tests");

        let mut tests_table = create_table();
        tests_table.set_header(cyan_header(&["Job", "Sig", "Test", "Linked Issues"]));
        for (job, status) in flaking {
            for test in status.tests() {
                tests_table.add_row(vec![
                    Cell::new(job),
                    Cell::new(test.sig.trim_end()),
                    Cell::new(&test.name),
                    linked_issues_cell(&test.linked_issues),
                ]);
            }
        }
        let _ = writeln!(output, "{tests_table}\n");
    }

    if !failing.is_empty() {
        add_section_header(&mut output, "🔥", "Failing Jobs");

        let mut failing_table = create_table();
        failing_table.set_header(cyan_header(&["Job", "Status", "Failing Tests", "Last Run"]));
        for (job, status) in failing {
            failing_table.add_row(vec![
                Cell::new(job),
                status_cell(status.overall_status),
                Cell::new(status.tests().len()),
                days_ago_cell(job_days_ago(status, now)),
            ]);
        }
        let _ = writeln!(output, "{failing_table}\n");
    }

    if !links.skipped.is_empty() {
        add_section_header(&mut output, "⚠️", "Skipped Issues");

        let mut skipped_table = create_table();
        skipped_table.set_header(cyan_header(&["Issue", "Kind", "Reason"]));
        for skipped in &links.skipped {
            skipped_table.add_row(vec![
                Cell::new(format!("#{} {}", skipped.issue.number, skipped.issue.title)),
                Cell::new(skipped.kind),
                Cell::new(&skipped.reason),
            ]);
        }
        let _ = writeln!(output, "{skipped_table}\n");

        let counts = links
            .skipped_by_kind()
            .into_iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(output, "  {} {}\n", dim("Skipped by kind:"), counts);
    }

    output
}
