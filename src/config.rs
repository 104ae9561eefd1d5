use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use std::time::Duration;

pub const ENV_PREFIX: &str = "STREAKBOARD_";

/// Settings read from `STREAKBOARD_*` environment variables (a `.env` file in
/// the working directory is loaded first).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    pub github_token: Option<String>,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Comma-separated `owner/repo` list to sync contributors from.
    #[serde(default)]
    pub github_repos: Vec<String>,

    /// Longest single wait for a GitHub rate-limit reset.
    #[serde(default = "default_rate_limit_max_wait_secs")]
    pub rate_limit_max_wait_secs: u64,
}

fn default_database_path() -> String {
    String::from("streakboard.db")
}

fn default_github_api_url() -> String {
    String::from("https://api.github.com")
}

fn default_rate_limit_max_wait_secs() -> u64 {
    15 * 60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            github_token: None,
            github_api_url: default_github_api_url(),
            github_repos: Vec::new(),
            rate_limit_max_wait_secs: default_rate_limit_max_wait_secs(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        envy::prefixed(ENV_PREFIX)
            .from_env::<Settings>()
            .context("Could not read STREAKBOARD_* settings from the environment")
    }

    pub fn rate_limit_max_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_max_wait_secs)
    }

    /// Parses the configured repositories into `(owner, repo)` pairs.
    pub fn repositories(&self) -> Result<Vec<RepoRef>> {
        self.github_repos
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(RepoRef::parse)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn parse(full_name: &str) -> Result<Self> {
        match full_name.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self { owner: owner.to_string(), repo: repo.to_string() })
            }
            _ => Err(anyhow!("Expected a repository as owner/repo, got '{full_name}'")),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
