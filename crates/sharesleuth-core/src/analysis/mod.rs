/// Post-classification analysis — the issue inventory and run summary
/// handed to the external report renderer.
pub mod issues;
pub mod summary;

pub use issues::{collect_issues, Issue, IssueType};
pub use summary::{format_size, summarize, RunSummary};
