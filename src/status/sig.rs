use std::sync::OnceLock;

use regex::Regex;

/// Tag used for tests whose name carries no `[sig-...]` owner.
pub const DEFAULT_SIG: &str = "job-owner";

fn sig_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[sig-.+?\] ").expect("sig regex"))
}

/// Returns the owning SIG tag embedded in a test name.
///
/// The tag is the first `[sig-<name>] ` occurrence, trailing space included,
/// so it can be prefixed straight onto report rows. Names without a tag belong
/// to the job owner.
pub fn extract_sig(test_name: &str) -> &str {
    sig_regex()
        .find(test_name)
        .map_or(DEFAULT_SIG, |m| m.as_str())
}
