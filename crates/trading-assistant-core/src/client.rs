//! HTTP client for the question-answering endpoint
//!
//! Every call is a single `POST {base_url}/ask` attempt. Whatever goes wrong
//! is folded into one [`QueryError`] whose display text is ready to show to
//! the user.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ClientConfig;

pub const SERVER_ERROR_FALLBACK: &str = "server returned an error";

/// Failure of a single ask call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The endpoint answered with a non-success status
    #[error("{0}")]
    Server(String),
    /// The request went out but nothing came back (connect failure, timeout)
    #[error("no response from server, check connection.")]
    NoResponse,
    /// The request could not be built or dispatched at all
    #[error("request error: {0}")]
    Client(String),
}

/// Anything that can answer a question. The TUI and the conversation
/// driver only depend on this, so tests can swap in a canned responder.
#[async_trait]
pub trait Ask: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, QueryError>;
}

#[derive(Serialize)]
struct AskRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct QueryClient {
    client: Client,
    config: ClientConfig,
}

impl QueryClient {
    pub fn new(config: ClientConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                error!(error = %e, "failed to build HTTP client");
                QueryError::Client(e.to_string())
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn ask(&self, question: &str) -> Result<String, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::Client("question must not be empty".to_string()));
        }

        let url = self.config.ask_url();

        let request = self
            .client
            .post(&url)
            .json(&AskRequest { query: question })
            .build()
            .map_err(|e| {
                error!(error = %e, url = %url, "failed to build ask request");
                QueryError::Client(e.to_string())
            })?;

        info!(url = %url, "sending question");

        let response = self.client.execute(request).await.map_err(|e| {
            error!(error = %e, url = %url, "no response from ask endpoint");
            if e.is_builder() {
                QueryError::Client(e.to_string())
            } else {
                QueryError::NoResponse
            }
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!(error = %e, %status, "failed to read ask response body");
            QueryError::NoResponse
        })?;

        if !status.is_success() {
            let message = server_error_message(&body);
            error!(%status, detail = %message, "ask endpoint returned an error");
            return Err(QueryError::Server(message));
        }

        match serde_json::from_slice::<AskResponse>(&body) {
            Ok(parsed) => Ok(parsed.answer.unwrap_or_default()),
            Err(e) => {
                // An unreadable success body is treated like a missing answer
                warn!(error = %e, "ask response was not the expected JSON");
                Ok(String::new())
            }
        }
    }
}

#[async_trait]
impl Ask for QueryClient {
    async fn ask(&self, question: &str) -> Result<String, QueryError> {
        QueryClient::ask(self, question).await
    }
}

/// Pull the `detail` string out of an error body, if the server sent one
fn server_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .unwrap_or_else(|| SERVER_ERROR_FALLBACK.to_string())
}
