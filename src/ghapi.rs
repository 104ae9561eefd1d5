use anyhow::{Context, Result, anyhow};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};

use std::time::Duration;

use crate::config::{RepoRef, Settings};
use crate::models::Contributor;

const PER_PAGE: usize = 100;

/// How many times a single request sleeps through a rate limit before giving up.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Anything that can list a repository's contributors.
#[allow(async_fn_in_trait)]
pub trait ContributorSource {
    async fn fetch_contributors(&self, repo: &RepoRef) -> Result<Vec<Contributor>>;
}

pub struct GithubClient {
    client: Client,
    api_url: String,
    max_wait: Duration,
}

impl GithubClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::from_iter([
            (header::ACCEPT, HeaderValue::from_static("application/vnd.github+json")),
            (header::USER_AGENT, HeaderValue::from_static(concat!("streakboard/", env!("CARGO_PKG_VERSION")))),
        ]);
        if let Some(token) = &settings.github_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("GitHub token contains invalid header characters")?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: settings.github_api_url.trim_end_matches('/').to_string(),
            max_wait: settings.rate_limit_max_wait(),
        })
    }

    /// GETs one page, sleeping through rate limits at most
    /// `MAX_RATE_LIMIT_RETRIES` times.
    async fn get_page(&self, url: &str, page: usize) -> Result<Vec<Contributor>> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .get(url)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await
                .with_context(|| format!("Request to {url} failed"))?;

            let status = response.status();
            if status == StatusCode::NO_CONTENT {
                return Ok(Vec::new());
            }
            if status.is_success() {
                return response
                    .json::<Vec<Contributor>>()
                    .await
                    .with_context(|| format!("Couldn't deserialize contributors from {url}"));
            }

            let wait = rate_limit_wait(status, response.headers(), chrono::Utc::now().timestamp());
            match wait {
                Some(wait) if attempt < MAX_RATE_LIMIT_RETRIES => {
                    attempt += 1;
                    let wait = wait.min(self.max_wait);
                    log::warn!("[get_page] Rate limited by GitHub, sleeping {}s (attempt {attempt}/{})",
                               wait.as_secs(), MAX_RATE_LIMIT_RETRIES);
                    tokio::time::sleep(wait).await;
                }
                Some(_) => {
                    return Err(anyhow!("Still rate limited by GitHub after {attempt} retries"));
                }
                None => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(anyhow!("GitHub returned {status} for {url}: {body}"));
                }
            }
        }
    }
}

impl ContributorSource for GithubClient {
    async fn fetch_contributors(&self, repo: &RepoRef) -> Result<Vec<Contributor>> {
        let url = format!("{}/repos/{}/{}/contributors", self.api_url, repo.owner, repo.repo);
        let mut contributors = Vec::new();

        for page in 1.. {
            let mut batch = self.get_page(&url, page).await?;
            let last_page = batch.len() < PER_PAGE;
            contributors.append(&mut batch);
            if last_page {
                break;
            }
        }

        log::info!("[fetch_contributors] Fetched {} contributors for {repo}", contributors.len());
        Ok(contributors)
    }
}

/// How long to wait before retrying, if `status`/`headers` describe a rate
/// limit. `now` is the current unix time in seconds.
pub fn rate_limit_wait(status: StatusCode, headers: &HeaderMap, now: i64) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    if let Some(seconds) = header_value("retry-after") {
        return Some(Duration::from_secs(seconds.max(0) as u64));
    }

    if header_value("x-ratelimit-remaining") == Some(0) {
        let reset = header_value("x-ratelimit-reset").unwrap_or(now + 60);
        // One extra second so the reset has definitely happened.
        return Some(Duration::from_secs((reset - now).max(0) as u64 + 1));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderName;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        HeaderMap::from_iter(pairs.iter().map(|&(k, v)| {
            (HeaderName::from_static(k), HeaderValue::from_str(v).unwrap())
        }))
    }

    #[test]
    fn exhausted_quota_waits_until_reset() {
        let h = headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1100")]);
        assert_eq!(
            rate_limit_wait(StatusCode::FORBIDDEN, &h, 1000),
            Some(Duration::from_secs(101))
        );
    }

    #[test]
    fn retry_after_takes_precedence() {
        let h = headers(&[("retry-after", "30"), ("x-ratelimit-remaining", "0")]);
        assert_eq!(
            rate_limit_wait(StatusCode::TOO_MANY_REQUESTS, &h, 0),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn plain_forbidden_is_not_a_rate_limit() {
        let h = headers(&[("x-ratelimit-remaining", "12")]);
        assert_eq!(rate_limit_wait(StatusCode::FORBIDDEN, &h, 0), None);
        assert_eq!(rate_limit_wait(StatusCode::NOT_FOUND, &HeaderMap::new(), 0), None);
    }

    #[test]
    fn contributors_deserialize_from_github_payload() {
        let payload = r#"[{
            "login": "octocat", "id": 583231, "contributions": 42,
            "avatar_url": "https://avatars.githubusercontent.com/u/583231",
            "html_url": "https://github.com/octocat", "type": "User",
            "site_admin": false
        }]"#;

        let contributors: Vec<Contributor> = serde_json::from_str(payload).unwrap();
        assert_eq!(contributors[0].github_id, 583231);
        assert_eq!(contributors[0].contributions, 42);
        assert_eq!(contributors[0].contributor_type, "User");
    }
}
