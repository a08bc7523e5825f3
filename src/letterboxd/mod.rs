pub mod histogram;
pub mod resolve;

use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;
use url::Url;

use crate::settings::Settings;

/// Transport-level failure of a single request. Never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {}s", .timeout.as_secs_f64())]
    Timeout { url: String, timeout: Duration },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// HTTP access to the rating site: one client, one base origin, one timeout.
pub struct Letterboxd {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl Letterboxd {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = settings.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            base: settings.base_url()?,
            timeout,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Redirect-based lookup endpoint: `<base>/imdb/<id>/`.
    pub fn lookup_url(&self, imdb_id: &str) -> Result<Url, FetchError> {
        Ok(self.base.join(&format!("/imdb/{}/", imdb_id))?)
    }

    /// Histogram fragment for a resource path: `<base>/csi<path>rating-histogram/`.
    pub fn histogram_url(&self, resource_path: &str) -> Result<Url, FetchError> {
        let mut path = resource_path.to_string();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        Ok(self.base.join(&format!("/csi{}rating-histogram/", path))?)
    }

    /// GET following redirects. Status codes are left to the caller.
    async fn get(&self, url: &Url) -> Result<Response, FetchError> {
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(url, e))
    }

    /// GET and read the body as text, rejecting non-2xx responses.
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| self.classify(url, e))
    }

    fn classify(&self, url: &Url, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}
