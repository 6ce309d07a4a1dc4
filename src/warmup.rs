use std::collections::HashSet;

use crate::cache::{CacheError, IconCache};
use crate::icons::{IconError, IconFetcher};
use crate::jira::Issue;
use crate::metrics::Metrics;

#[derive(Debug, thiserror::Error)]
pub enum WarmupError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Icon(#[from] IconError),
}

/// Makes sure every issue type seen in `issues` has a cached icon.
///
/// Each uncached type is attempted once per call. Failed downloads leave the
/// type uncached and do not record anything. Returns the number of icons
/// newly cached.
pub fn ensure_issue_type_icons(
    issues: &[Issue],
    cache: &mut IconCache,
    fetcher: &IconFetcher,
    metrics: &Metrics,
) -> Result<usize, WarmupError> {
    let mut attempted: HashSet<&str> = HashSet::new();
    let mut cached = 0;

    for issue in issues {
        let Some(issue_type) = &issue.issue_type else {
            continue;
        };
        if cache.contains(&issue_type.id) {
            metrics.inc_icon_cache_hit();
            continue;
        }
        if !attempted.insert(issue_type.id.as_str()) {
            continue;
        }
        metrics.inc_icon_cache_miss();

        let Some(icon_url) = issue_type.icon_url.as_deref() else {
            tracing::debug!(issuetype_id = %issue_type.id, "issue type has no icon url");
            continue;
        };
        if let Some(path) = fetcher.fetch(&issue_type.id, icon_url)? {
            cache.append(&issue_type.id, &path)?;
            cached += 1;
        }
    }

    if cached > 0 {
        tracing::info!(cached, "cached new issue type icons");
    }
    Ok(cached)
}
