mod sig;
mod snapshot;

pub use snapshot::{
    IssueRef, JobInventory, JobStatus, LinkedIssue, OverallStatus, RunStatus, StatusSnapshot,
    TestResult, TestResultSet,
};
