//! HTTP client for the mentoring backend.
//!
//! Every call carries the configured session cookie. The backend answers
//! 401 when the session is missing or expired.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{ErrorBody, HistoryMessage, UnreadCount};
use crate::chat::{CurrentUser, Room};
use crate::config::Config;
use crate::{ChatError, Result};

/// User agent string for API calls.
const USER_AGENT: &str = "mentorchat/0.1";

/// Client for the REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    /// Create a client from the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !config.session.cookie.is_empty() {
            let cookie = format!("{}={}", config.session.cookie_name, config.session.cookie);
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| ChatError::Config(format!("invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.server.connect_timeout_secs))
            .timeout(Duration::from_secs(config.server.request_timeout_secs))
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ChatError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: config.api_base(),
        })
    }

    /// Base URL of the API.
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `GET /auth/current-user`
    pub async fn current_user(&self) -> Result<CurrentUser> {
        self.get_json("/auth/current-user").await
    }

    /// `GET /chat/rooms`
    pub async fn chat_rooms(&self) -> Result<Vec<Room>> {
        self.get_json("/chat/rooms").await
    }

    /// `GET /chat/rooms/{id}/messages`
    pub async fn chat_messages(
        &self,
        room_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<HistoryMessage>> {
        let response = self
            .client
            .get(self.url(&format!("/chat/rooms/{room_id}/messages")))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }

    /// `POST /chat/rooms/{id}/mark-read`
    pub async fn mark_read(&self, room_id: i64) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/chat/rooms/{room_id}/mark-read")))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// `GET /chat/unread-count`
    pub async fn unread_count(&self) -> Result<i64> {
        let count: UnreadCount = self.get_json("/chat/unread-count").await?;
        Ok(count.unread_count)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        parse_json(check_status(response).await?).await
    }
}

/// Turn non-success responses into errors, using the backend's error body when present.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());

    tracing::debug!("API call failed with {}: {}", status, message);
    match status {
        StatusCode::UNAUTHORIZED => Err(ChatError::Unauthorized(message)),
        StatusCode::NOT_FOUND => Err(ChatError::NotFound(message)),
        _ => Err(ChatError::Http(format!("{status}: {message}"))),
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
