//! HTTP client for the remote board API.
//!
//! Thin `reqwest` wrapper. Status mapping and body parsing are pure
//! functions so they can be tested without a server.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use tracing::debug;

use super::{RemoteBoardClient, RemoteError};
use crate::config::ApiConfig;
use crate::model::{Board, BoardId, Communicator};

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpBoardClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBoardClient {
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| RemoteError::ClientBuild(e.to_string()))?;
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(config.timeouts.connect_secs));
        if let Some(secs) = config.timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| RemoteError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url, token: config.token })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        endpoint(&self.base_url, segments)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, subject: &str) -> Result<String, RemoteError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        debug!(status = status.as_u16(), %subject, "board API response");

        check_status(status, text, subject)
    }
}

#[async_trait::async_trait]
impl RemoteBoardClient for HttpBoardClient {
    async fn fetch_board(&self, id: &str) -> Result<Board, RemoteError> {
        let text = self.send(self.http.get(self.url(&["board", id])?), id).await?;
        parse_board(&text)
    }

    async fn create_board(&self, board: &Board) -> Result<BoardId, RemoteError> {
        let text = self
            .send(self.http.post(self.url(&["board"])?).json(board), &board.id)
            .await?;
        parse_created_id(&text)
    }

    async fn update_board(&self, board: &Board) -> Result<Board, RemoteError> {
        let text = self
            .send(self.http.put(self.url(&["board", board.id.as_str()])?).json(board), &board.id)
            .await?;
        parse_board(&text)
    }

    async fn delete_board(&self, id: &str) -> Result<(), RemoteError> {
        self.send(self.http.delete(self.url(&["board", id])?), id)
            .await?;
        Ok(())
    }

    async fn create_communicator(&self, communicator: &Communicator) -> Result<String, RemoteError> {
        let text = self
            .send(self.http.post(self.url(&["communicator"])?).json(communicator), &communicator.id)
            .await?;
        parse_created_id(&text)
    }

    async fn update_communicator(&self, communicator: &Communicator) -> Result<(), RemoteError> {
        let url = self.url(&["communicator", communicator.id.as_str()])?;
        self.send(self.http.put(url).json(communicator), &communicator.id)
            .await?;
        Ok(())
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Append path segments to the base URL, percent-encoding each one so an id
/// can never change the route.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| RemoteError::ClientBuild(format!("base URL cannot take a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(serde::Deserialize)]
struct CreatedResponse {
    id: String,
}

fn check_status(status: StatusCode, body: String, subject: &str) -> Result<String, RemoteError> {
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(subject.to_string()));
    }
    if !status.is_success() {
        return Err(RemoteError::Response { status: status.as_u16(), body });
    }
    Ok(body)
}

fn parse_board(json: &str) -> Result<Board, RemoteError> {
    serde_json::from_str(json).map_err(|e| RemoteError::Parse(e.to_string()))
}

fn parse_created_id(json: &str) -> Result<String, RemoteError> {
    let created: CreatedResponse = serde_json::from_str(json).map_err(|e| RemoteError::Parse(e.to_string()))?;
    if created.id.is_empty() {
        return Err(RemoteError::Parse("created entity has an empty id".into()));
    }
    Ok(created.id)
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
