use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "jira_issue_search=info,warn";
const DEBUG_FILTER: &str = "jira_issue_search=debug,warn";

/// Installs a stderr subscriber; stdout carries the script-filter payload.
///
/// `RUST_LOG` takes precedence. Otherwise `debug` selects between the info
/// and debug defaults for this crate.
pub fn init(debug: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let fallback = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)
}
