use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
#[cfg(test)]
use mockall::automock;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    StatusCode,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{config::AuthSettings, timeline::segment::TimelineSegment};

use super::models::{AccountMeta, TimeEntry};

const API_BASE_URL: &str = "https://api.track.toggl.com";
// The timeline endpoint lives on the web host, not on the api host.
const TIMELINE_BASE_URL: &str = "https://track.toggl.com";

#[derive(Error, Debug)]
pub enum TogglError {
    #[error("an api token or a username & password pair must be configured")]
    Credentials,
    #[error("rate limited")]
    RateLimited,
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("parsing error: {0}")]
    Parsing(String),
}

/// The three remote operations the synchronizer relies on. Abstracted so the
/// sync logic can be exercised against a mock.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TogglApi {
    /// Polls the time entry currently being tracked, if any.
    async fn current_entry(&self) -> Result<Option<TimeEntry>, TogglError>;

    /// Fetches the account snapshot with its project/task/tag tables.
    async fn account_meta(&self) -> Result<AccountMeta, TogglError>;

    /// Submits a batch of finalized segments. Success means every submitted
    /// entry was accepted; there are no partial acknowledgements.
    async fn push_timeline(&self, segments: Vec<TimelineSegment>) -> Result<(), TogglError>;
}

pub struct TogglClient {
    http: reqwest::Client,
    auth: AuthSettings,
}

impl TogglClient {
    pub fn new(auth: AuthSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            // total per-request bound: a stalled connection surfaces as a
            // transport error instead of an endless pending call
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, auth })
    }

    /// Builds the Basic-auth header for each call. An explicit api token
    /// takes priority over a username/password pair; having neither is a
    /// configuration error surfaced per call, not a process failure.
    fn basic_auth(&self) -> Result<String, TogglError> {
        let credentials = if let Some(token) = &self.auth.api_token {
            format!("{token}:api_token")
        } else if let (Some(username), Some(password)) = (&self.auth.username, &self.auth.password)
        {
            format!("{username}:{password}")
        } else {
            return Err(TogglError::Credentials);
        };
        Ok(format!("Basic {}", STANDARD.encode(credentials)))
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, TogglError> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.basic_auth()?)
            .send()
            .await
            .map_err(|e| TogglError::Transport(e.to_string()))?;

        let response = Self::checked(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TogglError::Parsing(e.to_string()))
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, TogglError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TogglError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TogglError::Status { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl TogglApi for TogglClient {
    async fn current_entry(&self) -> Result<Option<TimeEntry>, TogglError> {
        // a 200 with a literal `null` body means nothing is being tracked
        self.get(format!("{API_BASE_URL}/api/v9/me/time_entries/current"))
            .await
    }

    async fn account_meta(&self) -> Result<AccountMeta, TogglError> {
        self.get(format!("{API_BASE_URL}/api/v9/me?with_related_data=true"))
            .await
    }

    async fn push_timeline(&self, segments: Vec<TimelineSegment>) -> Result<(), TogglError> {
        let response = self
            .http
            .post(format!("{TIMELINE_BASE_URL}/api/v9/timeline"))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.basic_auth()?)
            .json(&segments)
            .send()
            .await
            .map_err(|e| TogglError::Transport(e.to_string()))?;

        Self::checked(response).await?;
        Ok(())
    }
}
