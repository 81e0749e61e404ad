use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::config::OutputFormat;
use crate::flakes::LinkSummary;
use crate::status::{JobStatus, OverallStatus, StatusSnapshot};

use super::summary::render_summary;

/// Everything one run produced, as serialized by the JSON export.
#[derive(Serialize)]
struct Report<'a> {
    snapshot: &'a StatusSnapshot,
    links: &'a LinkSummary,
}

/// Exports a linked snapshot in the requested format.
///
/// - Summary: the terminal tables
/// - Markdown: a report document for the CI signal meeting
/// - CSV: one row per flaking-job test
/// - JSON: the full snapshot and link summary
pub fn export_report(
    snapshot: &StatusSnapshot,
    links: &LinkSummary,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            write!(output, "{}", render_summary(snapshot, links))?;
            Ok(())
        }
        OutputFormat::Markdown => export_markdown(snapshot, links, output),
        OutputFormat::Csv => export_csv(snapshot, output),
        OutputFormat::Json => export_json(snapshot, links, pretty, output),
    }
}

/// Whole days between `at` and `now`.
pub fn days_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - at).num_days()
}

pub fn job_days_ago(job: &JobStatus, now: DateTime<Utc>) -> Option<i64> {
    job.last_run_at().map(|at| days_ago(at, now))
}

fn export_json(
    snapshot: &StatusSnapshot,
    links: &LinkSummary,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    let report = Report { snapshot, links };
    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn export_csv(snapshot: &StatusSnapshot, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "Dashboard,Job,Sig,Test,Issues")?;

    for (job, status) in snapshot.bucket(OverallStatus::Flaky) {
        for test in status.tests() {
            let issues = test
                .linked_issues
                .iter()
                .map(|linked| linked.issue.url.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                output,
                "{},{},{},{},{}",
                csv_field(&snapshot.name),
                csv_field(job),
                csv_field(test.sig.trim_end()),
                csv_field(&test.name),
                csv_field(&issues)
            )?;
        }
    }

    Ok(())
}

fn md_escape(text: &str) -> String {
    text.replace('|', "\\|")
}

fn md_job_link(job: &str, status: &JobStatus) -> String {
    match &status.human_url {
        Some(url) => format!("[{}]({url})", md_escape(job)),
        None => md_escape(job),
    }
}

fn md_last_run(status: &JobStatus, now: DateTime<Utc>) -> String {
    match job_days_ago(status, now) {
        Some(0) => "today".to_string(),
        Some(1) => "1 day ago".to_string(),
        Some(days) => format!("{days} days ago"),
        None => "never".to_string(),
    }
}

/// Run ages are relative to the collection time, not to when the report is
/// rendered.
fn export_markdown(
    snapshot: &StatusSnapshot,
    links: &LinkSummary,
    output: &mut dyn Write,
) -> Result<()> {
    let now = snapshot.collected_at;
    let flaking = snapshot.bucket(OverallStatus::Flaky);
    let failing = snapshot.bucket(OverallStatus::Failing);
    let passing = snapshot.bucket(OverallStatus::Passing);

    writeln!(output, "# {} flake report", snapshot.name)?;
    writeln!(output)?;
    writeln!(
        output,
        "Collected {} UTC{}.",
        snapshot.collected_at.format("%Y-%m-%d %H:%M"),
        snapshot
            .summary_url
            .as_ref()
            .map(|url| format!(" from <{url}>"))
            .unwrap_or_default()
    )?;
    writeln!(output)?;
    writeln!(
        output,
        "- **Jobs on dashboard:** {} ({} flaking, {} failing, {} passing)",
        snapshot.job_count(),
        flaking.len(),
        failing.len(),
        passing.len()
    )?;
    writeln!(
        output,
        "- **Reported flakes:** {} seen, {} linked, {} skipped",
        links.issues_seen,
        links.issues_linked,
        links.skipped.len()
    )?;
    writeln!(output, "- **Tests linked to issues:** {}", snapshot.linked_issue_count())?;
    writeln!(output)?;

    writeln!(output, "## Flaking jobs")?;
    writeln!(output)?;
    if flaking.is_empty() {
        writeln!(output, "No flaking jobs.")?;
        writeln!(output)?;
    }
    for (job, status) in flaking {
        writeln!(output, "### {}", md_job_link(job, status))?;
        writeln!(output)?;
        writeln!(
            output,
            "Last run {}. Latest green: {}.",
            md_last_run(status, now),
            if status.latest_green.is_empty() { "unknown" } else { status.latest_green.as_str() }
        )?;
        writeln!(output)?;

        if status.tests().is_empty() {
            writeln!(output, "No failing tests reported.")?;
            writeln!(output)?;
            continue;
        }

        writeln!(output, "| Sig | Test | Linked Issues |")?;
        writeln!(output, "| --- | --- | --- |")?;
        for test in status.tests() {
            let issues = if test.linked_issues.is_empty() {
                "-".to_string()
            } else {
                test.linked_issues
                    .iter()
                    .map(|linked| format!("[#{}]({})", linked.issue.number, linked.issue.url))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            writeln!(
                output,
                "| {} | {} | {} |",
                md_escape(test.sig.trim_end()),
                md_escape(&test.name),
                issues
            )?;
        }
        writeln!(output)?;
    }

    writeln!(output, "## Failing jobs")?;
    writeln!(output)?;
    if failing.is_empty() {
        writeln!(output, "No failing jobs.")?;
    } else {
        writeln!(output, "| Job | Failing Tests | Last Run |")?;
        writeln!(output, "| --- | --- | --- |")?;
        for (job, status) in failing {
            writeln!(
                output,
                "| {} | {} | {} |",
                md_job_link(job, status),
                status.tests().len(),
                md_last_run(status, now)
            )?;
        }
    }
    writeln!(output)?;

    writeln!(output, "## Passing jobs")?;
    writeln!(output)?;
    if passing.is_empty() {
        writeln!(output, "No passing jobs.")?;
    }
    for (job, status) in passing {
        writeln!(output, "- {}", md_job_link(job, status))?;
    }

    if !links.skipped.is_empty() {
        writeln!(output)?;
        writeln!(output, "## Skipped issues")?;
        writeln!(output)?;
        writeln!(output, "| Issue | Kind | Reason |")?;
        writeln!(output, "| --- | --- | --- |")?;
        for skipped in &links.skipped {
            writeln!(
                output,
                "| [#{}]({}) | {} | {} |",
                skipped.issue.number,
                skipped.issue.url,
                skipped.kind,
                md_escape(&skipped.reason)
            )?;
        }
    }

    Ok(())
}
