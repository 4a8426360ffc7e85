//! HTTP implementation of the remote reminder store and its health probe
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Operation              | Request                                   |
//! |------------------------|-------------------------------------------|
//! | health                 | `GET health`                              |
//! | list / delta           | `GET reminders[?updated_since=<rfc3339>]` |
//! | fetch                  | `GET reminders/{id}`                      |
//! | create                 | `POST reminders`                          |
//! | update                 | `PUT reminders/{id}`                      |
//! | versioned update       | `PUT reminders/{id}` + `If-Match: <v>`    |
//! | delete                 | `DELETE reminders/{id}`                   |
//! | orphaned task rows     | `GET tasks/orphans`                       |
//!
//! A versioned update answered with 409 or 412 is a stale write.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::IF_MATCH;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tether_core::preservation::ports::{HealthProbe, RemoteRepository};
use tether_domain::{OrphanTask, Reminder, RemoteConfig, Result, TetherError, VersionedWrite};
use tracing::{debug, instrument};
use url::Url;

use super::errors::RemoteError;
use crate::errors::InfraError;
use crate::http::HttpClient;

const USER_AGENT: &str = concat!("tetherd/", env!("CARGO_PKG_VERSION"));

/// Remote reminder store reached over HTTP
#[derive(Clone)]
pub struct HttpRemoteRepository {
    client: HttpClient,
}

impl HttpRemoteRepository {
    /// Wrap an already configured client
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build a client from remote settings
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let client = HttpClient::builder(&config.base_url)
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .bearer_token(config.api_token.clone())
            .build()?;
        Ok(Self::new(client))
    }

    fn reminder_url(&self, id: &str) -> Result<Url> {
        let mut url = self.client.url("reminders")?;
        url.path_segments_mut()
            .map_err(|()| {
                let base = self.client.base_url();
                TetherError::Config(format!("base URL {base} cannot carry a path"))
            })?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let response = self.client.send(self.client.request(Method::GET, path)?).await?;
        read_json(ensure_success(response).await?).await
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::from_response(status, &body).into())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response.json::<T>().await.map_err(|err| InfraError::from(err).into())
}

#[async_trait]
impl RemoteRepository for HttpRemoteRepository {
    #[instrument(skip(self, reminder), fields(entity_id = %reminder.id))]
    async fn create(&self, reminder: &Reminder) -> Result<Reminder> {
        let request = self.client.request(Method::POST, "reminders")?.json(reminder);
        let response = self.client.send(request).await?;
        read_json(ensure_success(response).await?).await
    }

    #[instrument(skip(self, reminder), fields(entity_id = %reminder.id))]
    async fn update_versioned(
        &self,
        reminder: &Reminder,
        expected_version: u64,
    ) -> Result<VersionedWrite> {
        let request = self
            .client
            .request_to(Method::PUT, self.reminder_url(&reminder.id)?)
            .header(IF_MATCH, expected_version.to_string())
            .json(reminder);
        let response = self.client.send(request).await?;

        match response.status() {
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED | StatusCode::NOT_FOUND => {
                debug!(status = %response.status(), expected_version, "versioned write rejected");
                Ok(VersionedWrite::stale())
            }
            _ => {
                let stored: Reminder = read_json(ensure_success(response).await?).await?;
                Ok(VersionedWrite::applied(stored.version.unwrap_or(expected_version + 1)))
            }
        }
    }

    #[instrument(skip(self, reminder), fields(entity_id = %reminder.id))]
    async fn update(&self, reminder: &Reminder) -> Result<Option<Reminder>> {
        let request =
            self.client.request_to(Method::PUT, self.reminder_url(&reminder.id)?).json(reminder);
        let response = self.client.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(ensure_success(response).await?).await.map(Some)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<bool> {
        let request = self.client.request_to(Method::DELETE, self.reminder_url(id)?);
        let response = self.client.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn get_all(&self) -> Result<Vec<Reminder>> {
        self.fetch_list("reminders").await
    }

    async fn get(&self, id: &str) -> Result<Option<Reminder>> {
        let request = self.client.request_to(Method::GET, self.reminder_url(id)?);
        let response = self.client.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(ensure_success(response).await?).await.map(Some)
    }

    async fn query_updated_since(&self, since: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let request = self
            .client
            .request(Method::GET, "reminders")?
            .query(&[("updated_since", since.to_rfc3339_opts(SecondsFormat::Millis, true))]);
        let response = self.client.send(request).await?;
        read_json(ensure_success(response).await?).await
    }

    async fn find_orphan_tasks(&self) -> Result<Vec<OrphanTask>> {
        self.fetch_list("tasks/orphans").await
    }
}

#[async_trait]
impl HealthProbe for HttpRemoteRepository {
    async fn health_check(&self) -> Result<()> {
        let response = self.client.send(self.client.request(Method::GET, "health")?).await?;
        ensure_success(response).await.map(|_| ()).map_err(|err| match err {
            TetherError::Transport(_) => err,
            other => TetherError::Transport(format!("health check failed: {other}")),
        })
    }
}
