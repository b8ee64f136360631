//! HTTP Backend Implementation
//!
//! Conversation backend for the host process's REST interface.
//!
//! # API
//!
//! - `GET  {base}/conversations/{id}/messages` returns a JSON array of
//!   `{id, content, sender, timestamp}`
//! - `POST {base}/conversations/{id}/messages` with `{content, agent_id?}`
//!   returns an optional acknowledgement body `{message_id?, reply?}`

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::traits::{ConversationBackend, SendAck};
use crate::config::BackendSettings;
use crate::error::BackendError;
use crate::messages::{AgentId, ConversationId, Message};

/// Request body for a send
#[derive(Serialize)]
struct SendBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_id: Option<&'a AgentId>,
}

/// HTTP conversation backend
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL; conversation paths are appended as segments
    base_url: reqwest::Url,
    /// Optional bearer token
    api_token: Option<String>,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse as a hierarchical URL
    /// or the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.into();
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| BackendError::Transport(format!("invalid base URL {base_url:?}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(BackendError::Transport(format!(
                "invalid base URL {base_url:?}: not a hierarchical URL"
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: parsed,
            api_token: None,
            http_client,
        })
    }

    /// Create from the `[backend]` configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, BackendError> {
        let mut backend = Self::new(settings.base_url.clone(), settings.request_timeout)?;
        backend.api_token = settings.api_token.clone();
        Ok(backend)
    }

    /// Attach a bearer token to every request
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Messages endpoint of a conversation
    ///
    /// The id is opaque, so it is percent-encoded as a single path segment.
    fn messages_url(&self, conversation_id: &ConversationId) -> reqwest::Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["conversations", conversation_id.as_str(), "messages"]);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn a non-success status into an error, passing the response through otherwise
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Decode a send acknowledgement; an empty body is a bare acknowledgement
fn decode_ack(body: &str) -> Result<SendAck, BackendError> {
    if body.trim().is_empty() {
        return Ok(SendAck::default());
    }
    serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl ConversationBackend for HttpBackend {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn fetch_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, BackendError> {
        let url = self.messages_url(conversation_id);
        tracing::debug!(url = %url, "Fetching messages");

        let response = self.authorize(self.http_client.get(url)).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        agent_id: Option<&AgentId>,
    ) -> Result<SendAck, BackendError> {
        let url = self.messages_url(conversation_id);
        tracing::debug!(url = %url, chars = content.chars().count(), "Sending message");

        let body = SendBody { content, agent_id };
        let response = self
            .authorize(self.http_client.post(url))
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;

        decode_ack(&body)
    }
}
