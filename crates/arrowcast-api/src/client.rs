// Snapshot HTTP client
//
// Wraps `reqwest::Client` with bracket-server URL construction and body
// decoding. Every endpoint returns a complete snapshot of one resource;
// incremental changes arrive over the push channel instead.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::wire::{PeopleList, RawCredits, RawPerson, RawStats, TournamentList};

/// Default request timeout applied when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the bracket server's JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client rooted at `base_url` (e.g. `https://bracket.example`).
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("arrowcast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    /// Build a client around a pre-configured `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    /// Derive the push-channel URL for `path`, swapping `http(s)` for `ws(s)`.
    pub fn push_url(&self, path: &str) -> Result<Url, Error> {
        let mut url = self.base_url.join(path)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => other,
        }
        .to_owned();
        // `set_scheme` only rejects switches between special and
        // non-special schemes, which http -> ws never is.
        let _ = url.set_scheme(&scheme);
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/tournaments/`
    pub async fn tournaments(&self) -> Result<TournamentList, Error> {
        self.get("tournaments/").await
    }

    /// `GET /api/user/` -- the signed-in person, or `{"authenticated": false}`.
    pub async fn user(&self) -> Result<RawPerson, Error> {
        self.get("user/").await
    }

    /// `GET /api/people/`
    pub async fn people(&self) -> Result<PeopleList, Error> {
        self.get("people/").await
    }

    /// `GET /api/people/stats/`
    pub async fn stats(&self) -> Result<RawStats, Error> {
        self.get("people/stats/").await
    }

    /// `GET /api/tournaments/{id}/credits/`
    pub async fn credits(&self, tournament_id: &str) -> Result<RawCredits, Error> {
        self.get(&format!("tournaments/{tournament_id}/credits/")).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                path: path.to_owned(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
