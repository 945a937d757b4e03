use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::github::{self, PullRequestRef};

pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const PR_NUMBER: &str = "PR_NUMBER";
pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const AI_FAILURE_POLICY: &str = "AI_FAILURE_POLICY";

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".pr-reviewer.toml";

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-pro-exp";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// What to do when the primary AI backend fails and no fallback backend is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AiFailurePolicy {
    /// Post a placeholder comment asking for manual review
    #[default]
    Degrade,
    /// Treat the failure as fatal for the run
    Fatal,
}

impl FromStr for AiFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(AiFailurePolicy::Degrade),
            "fatal" => Ok(AiFailurePolicy::Fatal),
            other => Err(format!("expected \"degrade\" or \"fatal\", got \"{other}\"")),
        }
    }
}

/// Optional settings read from .pr-reviewer.toml.
/// Every field is optional and secrets are never read from the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub github: GitHubFileConfig,

    #[serde(default)]
    pub gemini: BackendFileConfig,

    #[serde(default)]
    pub openai: BackendFileConfig,

    #[serde(default)]
    pub review: ReviewFileConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubFileConfig {
    /// REST API root, for GitHub Enterprise installs
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendFileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewFileConfig {
    pub ai_failure_policy: Option<AiFailurePolicy>,
}

impl FileConfig {
    /// Load the config file.
    ///
    /// An explicit path must exist. Without one, .pr-reviewer.toml in the
    /// current directory is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)
                } else {
                    Ok(FileConfig::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Credentials and endpoint for one AI backend.
#[derive(Clone)]
pub struct BackendSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Everything needed to talk to GitHub for one pull request.
/// This alone is enough to post a fallback comment.
#[derive(Clone)]
pub struct HostingSettings {
    pub token: String,
    pub api_url: String,
    pub pull_request: PullRequestRef,
}

impl std::fmt::Debug for HostingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostingSettings")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("pull_request", &self.pull_request)
            .finish()
    }
}

/// Run configuration, resolved once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub hosting: HostingSettings,
    /// Gemini
    pub primary: BackendSettings,
    /// OpenAI, present only when OPENAI_API_KEY is set
    pub secondary: Option<BackendSettings>,
    pub ai_failure_policy: AiFailurePolicy,
}

/// Read a variable from the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Wrap a lookup so blank values read as unset.
fn non_empty(lookup: impl Fn(&str) -> Option<String>) -> impl Fn(&str) -> Option<String> {
    move |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn require(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    missing: &mut Vec<String>,
) -> Option<String> {
    let value = get(name);
    if value.is_none() {
        missing.push(name.to_string());
    }
    value
}

fn parse_pull_request(repository: &str, number: &str) -> Result<PullRequestRef, ConfigError> {
    let number = number
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::Invalid {
            name: PR_NUMBER.to_string(),
            reason: format!("\"{number}\" is not a positive integer"),
        })?;
    github::parse_repository(repository, number).ok_or_else(|| ConfigError::Invalid {
        name: GITHUB_REPOSITORY.to_string(),
        reason: format!("\"{repository}\" is not in owner/name form"),
    })
}

fn api_url(file: &FileConfig, get: &impl Fn(&str) -> Option<String>) -> String {
    get(GITHUB_API_URL)
        .or_else(|| file.github.api_url.clone())
        .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string())
}

fn backend(api_key: String, file: &BackendFileConfig, model: &str, url: &str) -> BackendSettings {
    BackendSettings {
        api_key,
        model: file.model.clone().unwrap_or_else(|| model.to_string()),
        base_url: file.base_url.clone().unwrap_or_else(|| url.to_string()),
    }
}

impl HostingSettings {
    /// Resolve only the GitHub settings. Used to report a failure when the full
    /// configuration could not be built.
    pub fn resolve(
        file: &FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<HostingSettings, ConfigError> {
        let get = non_empty(lookup);
        let mut missing = Vec::new();
        let token = require(&get, GITHUB_TOKEN, &mut missing);
        let repository = require(&get, GITHUB_REPOSITORY, &mut missing);
        let number = require(&get, PR_NUMBER, &mut missing);

        let (Some(token), Some(repository), Some(number)) = (token, repository, number) else {
            return Err(ConfigError::Missing(missing));
        };

        Ok(HostingSettings {
            token,
            api_url: api_url(file, &get),
            pull_request: parse_pull_request(&repository, &number)?,
        })
    }
}

impl Config {
    /// Build the run configuration from the config file and an environment lookup.
    ///
    /// Every missing required variable is reported in a single `ConfigError::Missing`.
    pub fn resolve(
        file: &FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ConfigError> {
        let get = non_empty(lookup);
        let mut missing = Vec::new();
        let token = require(&get, GITHUB_TOKEN, &mut missing);
        let google_key = require(&get, GOOGLE_API_KEY, &mut missing);
        let repository = require(&get, GITHUB_REPOSITORY, &mut missing);
        let number = require(&get, PR_NUMBER, &mut missing);

        let (Some(token), Some(google_key), Some(repository), Some(number)) =
            (token, google_key, repository, number)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let ai_failure_policy = match get(AI_FAILURE_POLICY) {
            Some(raw) => raw
                .parse::<AiFailurePolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    name: AI_FAILURE_POLICY.to_string(),
                    reason,
                })?,
            None => file.review.ai_failure_policy.unwrap_or_default(),
        };

        Ok(Config {
            hosting: HostingSettings {
                token,
                api_url: api_url(file, &get),
                pull_request: parse_pull_request(&repository, &number)?,
            },
            primary: backend(google_key, &file.gemini, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL),
            secondary: get(OPENAI_API_KEY).map(|key| {
                backend(key, &file.openai, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL)
            }),
            ai_failure_policy,
        })
    }

    /// Build the run configuration from the process environment.
    pub fn from_env(file: &FileConfig) -> Result<Config, ConfigError> {
        Self::resolve(file, env_lookup)
    }
}
