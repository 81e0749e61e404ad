use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{FlakeTrackerError, IssueError};
use crate::logging::Diagnostics;

/// Header opening the list of reported tests in the flake issue template.
pub const TESTS_HEADER: &str = "Which test(s) are flaking:";
/// Header closing the list of reported tests.
pub const LINK_HEADER: &str = "Testgrid link:";
pub const DEFAULT_LINK_HOST: &str = "testgrid.k8s.io";

fn tests_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[*_#> \t]*(?i:which tests?(?:\(s\))? are flaking)[*_ \t]*:[*_]*")
            .expect("tests header regex")
    })
}

// Leading decoration is part of the match so it stays out of the test list.
fn link_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[*_#> \t]*(?i:testgrid link)[*_ \t]*:").expect("link header regex")
    })
}

/// Fields recovered from the body of a flake issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlakeReport {
    pub dashboard: String,
    pub job: String,
    pub tests: Vec<String>,
}

/// Extracts the dashboard link and the reported tests from flake issue bodies.
///
/// The dashboard link is the first `http(s)://<host>/...` URL in the body. For
/// `https://testgrid.k8s.io/sig-release-master-blocking#gce-cos-master` the
/// dashboard is `sig-release-master-blocking` and the job `gce-cos-master`.
///
/// Reported tests are the non-blank lines between [`TESTS_HEADER`] and
/// [`LINK_HEADER`]. A header must open its line, though markdown emphasis or
/// heading markers around it are fine. Surrounding backticks on a test line
/// are dropped and code fence lines are skipped.
pub struct IssueTextParser<'a> {
    link_re: Regex,
    dashboard_re: Regex,
    job_re: Regex,
    diagnostics: Diagnostics<'a>,
}

impl<'a> IssueTextParser<'a> {
    /// Creates a parser recognising dashboard links on `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the link patterns cannot be compiled.
    pub fn new(host: &str, diagnostics: Diagnostics<'a>) -> Result<Self, FlakeTrackerError> {
        let host = regex::escape(host);
        Ok(Self {
            link_re: Regex::new(&format!(r"https?://{host}/.+"))?,
            dashboard_re: Regex::new(&format!(r"{host}/([^#]+)#"))?,
            job_re: Regex::new(r"#(.+)")?,
            diagnostics,
        })
    }

    /// Parses every field out of an issue body.
    ///
    /// # Errors
    ///
    /// [`IssueError::PatternNotFound`] when the body has no usable dashboard
    /// link, [`IssueError::MissingSection`] when either header is absent.
    pub fn parse(&self, body: &str) -> Result<FlakeReport, IssueError> {
        let link = self.dashboard_link(body)?;
        let dashboard = self.dashboard_id(link)?;
        let job = self.job_id(link)?;
        let tests = self.reported_tests(body)?;

        self.diagnostics.debug(format_args!(
            "parsed dashboard {dashboard} job {job} with {} reported tests: {tests:?}",
            tests.len()
        ));

        Ok(FlakeReport {
            dashboard,
            job,
            tests,
        })
    }

    /// First dashboard URL in the body, up to the end of its line.
    pub fn dashboard_link<'b>(&self, body: &'b str) -> Result<&'b str, IssueError> {
        self.link_re
            .find(body)
            .map(|m| m.as_str())
            .ok_or_else(|| pattern_not_found(&self.link_re, preview(body)))
    }

    pub fn dashboard_id(&self, link: &str) -> Result<String, IssueError> {
        capture(&self.dashboard_re, link)
    }

    pub fn job_id(&self, link: &str) -> Result<String, IssueError> {
        capture(&self.job_re, link)
    }

    /// Test names listed between the two section headers, in body order.
    ///
    /// A header pair with nothing but blank lines between yields an empty list.
    pub fn reported_tests(&self, body: &str) -> Result<Vec<String>, IssueError> {
        let Some(start) = tests_header_regex().find(body) else {
            self.diagnostics
                .debug(format_args!("header missing: {TESTS_HEADER}"));
            return Err(IssueError::MissingSection {
                header: TESTS_HEADER,
            });
        };

        let Some(end) = link_header_regex().find_at(body, start.end()) else {
            self.diagnostics
                .debug(format_args!("header missing: {LINK_HEADER}"));
            return Err(IssueError::MissingSection {
                header: LINK_HEADER,
            });
        };

        let tests: Vec<String> = body[start.end()..end.start()]
            .lines()
            .filter_map(clean_test_line)
            .map(str::to_string)
            .collect();

        self.diagnostics
            .debug(format_args!("reported tests: {tests:?}"));
        Ok(tests)
    }
}

/// First capture group of `re` in `text`, minus a trailing carriage return.
fn capture(re: &Regex, text: &str) -> Result<String, IssueError> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().strip_suffix('\r').unwrap_or(m.as_str()))
        .filter(|target| !target.is_empty())
        .map(str::to_string)
        .ok_or_else(|| pattern_not_found(re, text.to_string()))
}

fn pattern_not_found(re: &Regex, text: String) -> IssueError {
    IssueError::PatternNotFound {
        pattern: re.as_str().to_string(),
        text,
    }
}

fn preview(body: &str) -> String {
    const MAX_CHARS: usize = 80;
    let first_line = body.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    if first_line.chars().count() > MAX_CHARS {
        let cut: String = first_line.chars().take(MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}

fn is_code_fence(line: &str) -> bool {
    line.starts_with("```") && !(line.len() > 6 && line.ends_with("```"))
}

fn clean_test_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || is_code_fence(line) {
        return None;
    }
    let name = line.trim_matches('`').trim();
    (!name.is_empty()).then_some(name)
}
