//! Blocking wallabag API client. Logs in with the OAuth2 password grant on first use
//! and reuses the bearer token until it is about to expire.

use crate::config::Config;
use crate::model::EntriesPage;
use crate::wallabag::{ApiError, EntryQuery, ExportFormat, WallabagApi};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str = concat!("kindlebag/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// A token this close to expiry is replaced before the next request.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// OAuth client and user credentials for the password grant.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl From<&Config> for Credentials {
    fn from(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            username: config.user_name.clone(),
            password: config.user_password.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct Token {
    access_token: String,
    expires_at: Option<Instant>,
}

impl Token {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() + TOKEN_REFRESH_MARGIN < at,
            None => true,
        }
    }
}

/// Blocking client for one wallabag instance.
pub struct WallabagClient {
    inner: reqwest::blocking::Client,
    base_url: String,
    credentials: Credentials,
    token: Option<Token>,
}

impl fmt::Debug for WallabagClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WallabagClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl WallabagClient {
    /// Build a client from the config file settings (URL, credentials, User-Agent, timeout).
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Self::builder(config.base_url(), Credentials::from(config));
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout_secs(secs);
        }
        builder.build()
    }

    pub fn builder(base_url: impl Into<String>, credentials: Credentials) -> WallabagClientBuilder {
        WallabagClientBuilder {
            base_url: base_url.into(),
            credentials,
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current access token, logging in first if there is none or it is about to expire.
    fn access_token(&mut self) -> Result<String, ApiError> {
        if let Some(token) = self.token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }
        let token = self.login()?;
        let access_token = token.access_token.clone();
        self.token = Some(token);
        Ok(access_token)
    }

    fn login(&self) -> Result<Token, ApiError> {
        let url = format!("{}/oauth/v2/token", self.base_url);
        tracing::debug!(%url, user = %self.credentials.username, "requesting access token");
        let form = [
            ("grant_type", "password"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        let response = self
            .inner
            .post(&url)
            .form(&form)
            .send()
            .map_err(|e| ApiError::Network {
                url: url.clone(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Auth {
                status: status.as_u16(),
                url,
            });
        }
        let token: TokenResponse = response.json().map_err(|e| ApiError::Decode {
            url: url.clone(),
            source: e,
        })?;
        tracing::trace!(expires_in = ?token.expires_in, "access token received");
        Ok(Token {
            access_token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }

    /// Authenticated GET. Non-2xx responses become [ApiError::HttpStatus].
    fn get(
        &mut self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::blocking::Response, ApiError> {
        let token = self.access_token()?;
        let mut request = self.inner.get(url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        tracing::debug!(%url, ?query, "GET");
        let response = request.send().map_err(|e| ApiError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl WallabagApi for WallabagClient {
    fn list_entries(&mut self, query: &EntryQuery) -> Result<EntriesPage, ApiError> {
        let url = format!("{}/api/entries.json", self.base_url);
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(tags) = &query.tags {
            params.push(("tags", tags.clone()));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(per_page) = query.per_page {
            params.push(("perPage", per_page.to_string()));
        }
        let response = self.get(&url, &params)?;
        let page: EntriesPage = response.json().map_err(|e| ApiError::Decode {
            url: url.clone(),
            source: e,
        })?;
        tracing::trace!(
            page = page.page,
            limit = page.limit,
            pages = page.pages,
            total = page.total,
            items = page.items().len(),
            "entries page"
        );
        Ok(page)
    }

    fn export_entry(&mut self, id: u64, format: ExportFormat) -> Result<Vec<u8>, ApiError> {
        let url = format!(
            "{}/api/entries/{}/export.{}",
            self.base_url,
            id,
            format.keyword()
        );
        let response = self.get(&url, &[])?;
        let bytes = response.bytes().map_err(|e| ApiError::BodyRead {
            url: url.clone(),
            source: e,
        })?;
        tracing::trace!(id, len = bytes.len(), "export received");
        Ok(bytes.to_vec())
    }
}

/// Builder for [WallabagClient] with optional User-Agent and timeout.
#[derive(Debug)]
pub struct WallabagClientBuilder {
    base_url: String,
    credentials: Credentials,
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl WallabagClientBuilder {
    /// Set a custom User-Agent. Default `kindlebag/<version>`.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<WallabagClient, ApiError> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(ApiError::ClientBuild)?;
        Ok(WallabagClient {
            inner,
            base_url,
            credentials: self.credentials,
            token: None,
        })
    }
}
