//! `jira-issue-search` runs a JQL search against Jira Cloud and turns the
//! results into launcher script-filter items with cached issue type icons.

/// Issue type icon cache and its on-disk record file.
pub mod cache;
/// Runtime configuration loading and validation.
pub mod config;
/// Issue type icon downloads.
pub mod icons;
/// Jira search client and issue data models.
pub mod jira;
/// Tracing subscriber setup.
pub mod logging;
/// Per-run counters.
pub mod metrics;
/// Filtering and script-filter output.
pub mod render;
/// Icon resolution pass run before rendering.
pub mod warmup;
