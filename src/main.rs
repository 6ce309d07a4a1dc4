use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use jira_issue_search::cache::IconCache;
use jira_issue_search::config::{self, AppConfigOverrides};
use jira_issue_search::icons::IconFetcher;
use jira_issue_search::jira::JiraClient;
use jira_issue_search::logging;
use jira_issue_search::metrics::{self, Metrics};
use jira_issue_search::render::{build_response, normalize_query};

/// Search Jira with JQL and print launcher script-filter JSON.
#[derive(Debug, Parser)]
#[command(name = "jira-issue-search", version, about)]
struct Cli {
    /// Only show issues whose summary or key contains this text
    #[arg(allow_hyphen_values = true)]
    query: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// JQL to run (overrides JIRA_JQL)
    #[arg(long)]
    jql: Option<String>,

    /// Maximum number of issues to request (overrides JIRA_JQL_MAX_RESULTS)
    #[arg(long)]
    max_results: Option<usize>,

    /// Directory for the icon cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides {
            jira_jql: self.jql.clone(),
            jira_max_results: self.max_results,
            cache_dir: self.cache_dir.clone(),
            logging_debug: self.debug.then_some(true),
            ..Default::default()
        }
    }
}

fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("{}", error_message(err.as_ref()));
        std::process::exit(1);
    }
}

fn error_message(err: &dyn std::error::Error) -> String {
    format!("error: {err}")
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load(cli.config.as_deref(), &cli.overrides())?;
    logging::init(cfg.logging.debug)?;

    let metrics = Arc::new(Metrics::new());
    let timeout = cfg.jira.timeout_secs.map(Duration::from_secs);

    let mut cache = IconCache::load(&cfg.cache.dir)?;
    let fetcher = IconFetcher::new(cache.dir(), timeout, Arc::clone(&metrics))?;
    let jira = JiraClient::new_with_metrics(
        cfg.jira.site_url(),
        cfg.jira.username.clone(),
        cfg.jira.api_token.clone(),
        timeout,
        Arc::clone(&metrics),
    )?;
    tracing::debug!(base_url = %jira.base_url, cache_dir = %cache.dir().display(), "configured");

    let issues = jira.search_issues(&cfg.jira.jql, cfg.jira.max_results)?;
    let query = normalize_query(cli.query.as_deref());
    let response = build_response(
        &issues,
        &mut cache,
        &fetcher,
        &metrics,
        query.as_deref(),
        |key| jira.browse_url(key),
    )?;

    println!("{}", response.to_json()?);
    metrics::log_summary(&metrics);
    Ok(())
}
