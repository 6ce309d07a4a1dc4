use serde::Serialize;

use crate::cache::IconCache;
use crate::icons::IconFetcher;
use crate::jira::Issue;
use crate::metrics::Metrics;
use crate::warmup::{ensure_issue_type_icons, WarmupError};

/// Top-level payload printed for the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptFilter {
    pub items: Vec<ResultItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    pub title: String,
    pub subtitle: String,
    pub arg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<ItemIcon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemIcon {
    pub path: String,
}

impl ScriptFilter {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Trims the raw filter argument. Blank input disables filtering.
pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|query| !query.is_empty())
        .map(ToString::to_string)
}

/// Case-insensitive substring match against the summary or the key.
pub fn matches_query(issue: &Issue, query: &str) -> bool {
    let needle = query.to_lowercase();
    issue.summary.to_lowercase().contains(&needle) || issue.key.to_lowercase().contains(&needle)
}

pub fn render_items<F>(
    issues: &[Issue],
    cache: &IconCache,
    query: Option<&str>,
    browse_url: F,
) -> ScriptFilter
where
    F: Fn(&str) -> String,
{
    let items = issues
        .iter()
        .filter(|issue| query.map_or(true, |q| matches_query(issue, q)))
        .map(|issue| ResultItem {
            title: issue.summary.clone(),
            subtitle: issue.key.clone(),
            arg: browse_url(&issue.key),
            icon: issue
                .issue_type
                .as_ref()
                .and_then(|t| cache.get(&t.id))
                .map(|path| ItemIcon {
                    path: path.to_string_lossy().into_owned(),
                }),
        })
        .collect();

    ScriptFilter { items }
}

/// Caches any missing issue type icons, then renders the filtered items in
/// search order.
pub fn build_response<F>(
    issues: &[Issue],
    cache: &mut IconCache,
    fetcher: &IconFetcher,
    metrics: &Metrics,
    query: Option<&str>,
    browse_url: F,
) -> Result<ScriptFilter, WarmupError>
where
    F: Fn(&str) -> String,
{
    ensure_issue_type_icons(issues, cache, fetcher, metrics)?;
    let response = render_items(issues, cache, query, browse_url);
    tracing::debug!(
        total = issues.len(),
        shown = response.items.len(),
        filtered = query.is_some(),
        "rendered script filter items"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::cache::persistent::CACHE_FILE_NAME;
    use crate::jira::{IssueType, JiraClient};

    fn issue(key: &str, summary: &str, type_id: &str, icon_url: &str) -> Issue {
        Issue {
            key: key.to_string(),
            summary: summary.to_string(),
            issue_type: Some(IssueType {
                id: type_id.to_string(),
                icon_url: Some(icon_url.to_string()),
            }),
        }
    }

    fn browse(key: &str) -> String {
        format!("https://acme.atlassian.net/browse/{key}")
    }

    fn search_body(server: &MockServer) -> serde_json::Value {
        json!({
            "issues": [
                {"key": "ACME-1", "fields": {"summary": "Login page broken",
                    "issuetype": {"id": "10001", "iconUrl": server.url("/icons/bug.png")}}},
                {"key": "ACME-2", "fields": {"summary": "Add dark mode",
                    "issuetype": {"id": "10002", "iconUrl": server.url("/icons/story.svg")}}},
                {"key": "OPS-3", "fields": {"summary": "Rotate LOGIN secrets",
                    "issuetype": {"id": "10001", "iconUrl": server.url("/icons/bug.png")}}}
            ]
        })
    }

    struct Fixture {
        server: MockServer,
        client: JiraClient,
        fetcher: IconFetcher,
        metrics: Arc<Metrics>,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let server = MockServer::start();
            let body = search_body(&server);
            server.mock(|when, then| {
                when.method(POST).path("/rest/api/3/search/jql");
                then.status(200).json_body(body);
            });
            let dir = tempfile::tempdir().expect("tempdir");
            let metrics = Arc::new(Metrics::new());
            let client = JiraClient::new(server.base_url(), "u".into(), "t".into())
                .expect("client");
            let fetcher =
                IconFetcher::new(dir.path(), None, Arc::clone(&metrics)).expect("fetcher");
            Self {
                server,
                client,
                fetcher,
                metrics,
                dir,
            }
        }

        fn run(&self, query: Option<&str>) -> ScriptFilter {
            let mut cache = IconCache::load(self.dir.path()).expect("cache");
            let issues = self.client.search_issues("project = ACME", 20).expect("search");
            build_response(
                &issues,
                &mut cache,
                &self.fetcher,
                &self.metrics,
                query,
                |key| self.client.browse_url(key),
            )
            .expect("build")
        }

        fn cache_file(&self) -> std::path::PathBuf {
            self.dir.path().join(CACHE_FILE_NAME)
        }
    }

    fn path_str(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn unfiltered_output_keeps_every_issue_in_order() {
        let fx = Fixture::new();
        let bug = fx.server.mock(|when, then| {
            when.method(GET).path("/icons/bug.png");
            then.status(200).header("Content-Type", "image/png").body("png");
        });
        fx.server.mock(|when, then| {
            when.method(GET).path("/icons/story.svg");
            then.status(200).header("Content-Type", "image/svg+xml").body("<svg/>");
        });

        let out = fx.run(None);

        let keys: Vec<&str> = out.items.iter().map(|i| i.subtitle.as_str()).collect();
        assert_eq!(keys, vec!["ACME-1", "ACME-2", "OPS-3"]);
        assert_eq!(out.items[0].title, "Login page broken");
        assert_eq!(
            out.items[0].arg,
            format!("{}/browse/ACME-1", fx.server.base_url())
        );
        assert_eq!(
            out.items[0].icon,
            Some(ItemIcon {
                path: path_str(&fx.dir.path().join("10001.png"))
            })
        );
        assert_eq!(
            out.items[1].icon,
            Some(ItemIcon {
                path: path_str(&fx.dir.path().join("10002.svg"))
            })
        );
        bug.assert_hits(1);
    }

    #[test]
    fn filter_matches_title_or_key_case_insensitively() {
        let fx = Fixture::new();
        fx.server.mock(|when, then| {
            when.method(GET);
            then.status(200).header("Content-Type", "image/png").body("png");
        });

        let by_title = fx.run(Some("login"));
        let keys: Vec<&str> = by_title.items.iter().map(|i| i.subtitle.as_str()).collect();
        assert_eq!(keys, vec!["ACME-1", "OPS-3"]);

        let by_key = fx.run(Some("ops-"));
        let keys: Vec<&str> = by_key.items.iter().map(|i| i.subtitle.as_str()).collect();
        assert_eq!(keys, vec!["OPS-3"]);

        assert!(fx.run(Some("nothing matches")).items.is_empty());
    }

    #[test]
    fn valid_cached_icons_are_not_fetched_again() {
        let fx = Fixture::new();
        let bug_icon = fx.dir.path().join("10001.png");
        let story_icon = fx.dir.path().join("10002.svg");
        std::fs::write(&bug_icon, b"png").expect("write");
        std::fs::write(&story_icon, b"svg").expect("write");
        {
            let mut cache = IconCache::load(fx.dir.path()).expect("cache");
            cache.append("10001", &bug_icon).expect("append");
            cache.append("10002", &story_icon).expect("append");
        }
        let icons = fx.server.mock(|when, then| {
            when.method(GET);
            then.status(200).header("Content-Type", "image/png").body("png");
        });

        let out = fx.run(None);

        icons.assert_hits(0);
        assert_eq!(
            out.items[2].icon,
            Some(ItemIcon {
                path: path_str(&bug_icon)
            })
        );
    }

    #[test]
    fn stale_cache_entries_are_fetched_again() {
        let fx = Fixture::new();
        let story_icon = fx.dir.path().join("10002.svg");
        std::fs::write(&story_icon, b"svg").expect("write");
        {
            let mut cache = IconCache::load(fx.dir.path()).expect("cache");
            cache
                .append("10001", &fx.dir.path().join("deleted.png"))
                .expect("append");
            cache.append("10002", &story_icon).expect("append");
        }
        let bug = fx.server.mock(|when, then| {
            when.method(GET).path("/icons/bug.png");
            then.status(200).header("Content-Type", "image/png").body("png");
        });
        let story = fx.server.mock(|when, then| {
            when.method(GET).path("/icons/story.svg");
            then.status(200).header("Content-Type", "image/svg+xml").body("<svg/>");
        });

        let out = fx.run(None);

        bug.assert_hits(1);
        story.assert_hits(0);
        assert_eq!(
            out.items[0].icon,
            Some(ItemIcon {
                path: path_str(&fx.dir.path().join("10001.png"))
            })
        );
    }

    #[test]
    fn missing_icon_omits_icon_field_and_cache_line() {
        let fx = Fixture::new();
        fx.server.mock(|when, then| {
            when.method(GET).path("/icons/bug.png");
            then.status(404);
        });
        fx.server.mock(|when, then| {
            when.method(GET).path("/icons/story.svg");
            then.status(200).header("Content-Type", "image/svg+xml").body("<svg/>");
        });

        let out = fx.run(None);
        let json: serde_json::Value =
            serde_json::from_str(&out.to_json().expect("json")).expect("parse");

        assert!(json["items"][0].get("icon").is_none());
        assert!(json["items"][2].get("icon").is_none());
        assert_eq!(
            json["items"][1]["icon"]["path"],
            json!(path_str(&fx.dir.path().join("10002.svg")))
        );

        let raw = std::fs::read_to_string(fx.cache_file()).expect("cache file");
        assert_eq!(raw.lines().count(), 1);
        assert!(!raw.contains("\"10001\""));
        assert_eq!(fx.metrics.snapshot().icon_failures, 1);
    }

    #[test]
    fn serializes_launcher_payload_shape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = IconCache::load(dir.path()).expect("cache");
        let issues = vec![issue("ACME-9", "Ship it", "1", "https://x/1.png")];

        let out = render_items(&issues, &cache, None, browse);
        assert_eq!(
            out.to_json().expect("json"),
            r#"{"items":[{"title":"Ship it","subtitle":"ACME-9","arg":"https://acme.atlassian.net/browse/ACME-9"}]}"#
        );
    }

    #[test]
    fn normalizes_query_argument() {
        assert_eq!(normalize_query(Some("  Login ")), Some("Login".to_string()));
        assert_eq!(normalize_query(Some("   ")), None);
        assert_eq!(normalize_query(None), None);
    }

    #[test]
    fn matches_query_ignores_case() {
        let item = issue("ACME-12", "Fix Payment Flow", "1", "https://x/1.png");
        assert!(matches_query(&item, "payment"));
        assert!(matches_query(&item, "acme-1"));
        assert!(!matches_query(&item, "refund"));
    }
}
