use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const ENV_USERNAME: &str = "JIRA_AUTH_USERNAME";
pub const ENV_API_TOKEN: &str = "JIRA_AUTH_TOKEN_PASSWORD";
pub const ENV_ORG: &str = "JIRA_ORG_NAME";
pub const ENV_BASE_URL: &str = "JIRA_BASE_URL";
pub const ENV_JQL: &str = "JIRA_JQL";
pub const ENV_MAX_RESULTS: &str = "JIRA_JQL_MAX_RESULTS";
pub const ENV_TIMEOUT_SECS: &str = "JIRA_HTTP_TIMEOUT_SECS";
pub const ENV_CACHE_DIR: &str = "alfred_workflow_cache";
pub const ENV_DEBUG: &str = "JIRA_SEARCH_DEBUG";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub org: String,
    /// Overrides the `https://{org}.atlassian.net` site address.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub jql: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            api_token: String::new(),
            org: String::new(),
            base_url: None,
            jql: String::new(),
            max_results: default_max_results(),
            timeout_secs: None,
        }
    }
}

impl JiraConfig {
    /// Site address used for both the search endpoint and browse links.
    pub fn site_url(&self) -> String {
        match self.base_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => format!("https://{}.atlassian.net", self.org.trim()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Default, Clone)]
pub struct AppConfigOverrides {
    pub jira_username: Option<String>,
    pub jira_api_token: Option<String>,
    pub jira_org: Option<String>,
    pub jira_base_url: Option<String>,
    pub jira_jql: Option<String>,
    pub jira_max_results: Option<usize>,
    pub jira_timeout_secs: Option<u64>,
    pub cache_dir: Option<PathBuf>,
    pub logging_debug: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found at {path}")]
    MissingConfigFile { path: PathBuf },
    #[error("failed to read config file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse TOML config at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Builds the effective configuration: config file, then environment, then
/// command-line overrides.
///
/// An explicit `path` must exist. Without one, the default location is used
/// only when a file is present there.
pub fn load(path: Option<&Path>, cli: &AppConfigOverrides) -> Result<AppConfig, ConfigError> {
    load_layered(
        path,
        resolve_config_path(),
        |name| std::env::var(name).ok(),
        cli,
    )
}

fn load_layered<F>(
    path: Option<&Path>,
    default_path: Option<PathBuf>,
    env_lookup: F,
    cli: &AppConfigOverrides,
) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match path {
        Some(path) => load_from(path)?,
        None => match default_path {
            Some(default_path) if default_path.is_file() => load_from(&default_path)?,
            _ => AppConfig::default(),
        },
    };

    let env = AppConfigOverrides::from_env(env_lookup)?;
    cfg.apply_overrides(&env);
    cfg.apply_overrides(cli);
    cfg.validate()?;
    Ok(cfg)
}

/// Reads a TOML config file without validating it; later layers may still
/// fill in required values.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let path = path.to_path_buf();
    let raw = std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingConfigFile { path: path.clone() }
        } else {
            ConfigError::ReadFailed {
                path: path.clone(),
                source,
            }
        }
    })?;

    toml::from_str::<AppConfig>(&raw).map_err(|source| ConfigError::ParseFailed { path, source })
}

pub fn resolve_config_path() -> Option<PathBuf> {
    let xdg_config_home = std::env::var_os("XDG_CONFIG_HOME");
    let home = std::env::var_os("HOME");
    resolve_config_path_from_env(xdg_config_home, home)
}

fn resolve_config_path_from_env(
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    if let Some(dir) = xdg_config_home.filter(|value| !value.is_empty()) {
        return Some(
            PathBuf::from(dir)
                .join("jira-issue-search")
                .join("config.toml"),
        );
    }

    let home = home.filter(|value| !value.is_empty())?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("jira-issue-search")
            .join("config.toml"),
    )
}

impl AppConfigOverrides {
    /// Collects overrides from environment variables through `lookup`.
    /// Empty values count as unset.
    pub fn from_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let jira_max_results = get(ENV_MAX_RESULTS)
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        name: ENV_MAX_RESULTS,
                        value: raw.clone(),
                    })
            })
            .transpose()?;
        let jira_timeout_secs = get(ENV_TIMEOUT_SECS)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        name: ENV_TIMEOUT_SECS,
                        value: raw.clone(),
                    })
            })
            .transpose()?;

        Ok(Self {
            jira_username: get(ENV_USERNAME),
            jira_api_token: get(ENV_API_TOKEN),
            jira_org: get(ENV_ORG),
            jira_base_url: get(ENV_BASE_URL),
            jira_jql: get(ENV_JQL),
            jira_max_results,
            jira_timeout_secs,
            cache_dir: get(ENV_CACHE_DIR).map(PathBuf::from),
            logging_debug: get(ENV_DEBUG).map(|raw| is_truthy(&raw)),
        })
    }
}

fn is_truthy(raw: &str) -> bool {
    let normalized = raw.trim().to_ascii_lowercase();
    normalized == "1" || normalized == "true" || normalized == "yes"
}

impl AppConfig {
    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(value) = &overrides.jira_username {
            self.jira.username = value.clone();
        }
        if let Some(value) = &overrides.jira_api_token {
            self.jira.api_token = value.clone();
        }
        if let Some(value) = &overrides.jira_org {
            self.jira.org = value.clone();
        }
        if let Some(value) = &overrides.jira_base_url {
            self.jira.base_url = Some(value.clone());
        }
        if let Some(value) = &overrides.jira_jql {
            self.jira.jql = value.clone();
        }
        if let Some(value) = overrides.jira_max_results {
            self.jira.max_results = value;
        }
        if let Some(value) = overrides.jira_timeout_secs {
            self.jira.timeout_secs = Some(value);
        }
        if let Some(value) = &overrides.cache_dir {
            self.cache.dir = value.clone();
        }
        if let Some(value) = overrides.logging_debug {
            self.logging.debug = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jira.username.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "jira.username must not be empty (set {ENV_USERNAME})"
            )));
        }
        if self.jira.api_token.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "jira.api_token must not be empty (set {ENV_API_TOKEN})"
            )));
        }
        let has_base_url = self
            .jira
            .base_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if self.jira.org.trim().is_empty() && !has_base_url {
            return Err(ConfigError::Invalid(format!(
                "jira.org must not be empty (set {ENV_ORG})"
            )));
        }
        if self.jira.jql.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "jira.jql must not be empty (set {ENV_JQL})"
            )));
        }
        if self.jira.max_results == 0 {
            return Err(ConfigError::Invalid("jira.max_results must be > 0".into()));
        }
        if self.jira.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("jira.timeout_secs must be > 0".into()));
        }
        if self.cache.dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("cache.dir must not be empty".into()));
        }

        Ok(())
    }
}

const fn default_max_results() -> usize {
    20
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/tmp")
}
