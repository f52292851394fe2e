//! Remote board API — the network collaborator of the board graph.
//!
//! DESIGN
//! ======
//! `RemoteBoardClient` is the seam every service talks to. `HttpBoardClient`
//! is the production implementation; tests substitute an in-memory mock.
//! `OfflineClient` stands in when no API is configured so callers follow
//! the same degraded local-only path they take on a network failure.

pub mod http;

use crate::model::{Board, BoardId, Communicator};

pub use http::HttpBoardClient;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The requested entity does not exist remotely.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("API response error: status {status}")]
    Response { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl RemoteError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl crate::error::ErrorCode for RemoteError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Network(_) => "E_NETWORK",
            Self::Response { .. } => "E_API_RESPONSE",
            Self::Parse(_) => "E_API_PARSE",
            Self::ClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// CLIENT TRAIT
// =============================================================================

/// Remote board/communicator store. Every call may fail or stall.
#[async_trait::async_trait]
pub trait RemoteBoardClient: Send + Sync {
    async fn fetch_board(&self, id: &str) -> Result<Board, RemoteError>;

    /// Create a board; returns the id the remote store assigned.
    async fn create_board(&self, board: &Board) -> Result<BoardId, RemoteError>;

    /// Update a board; returns the stored representation.
    async fn update_board(&self, board: &Board) -> Result<Board, RemoteError>;

    async fn delete_board(&self, id: &str) -> Result<(), RemoteError>;

    /// Create a communicator; returns the id the remote store assigned.
    async fn create_communicator(&self, communicator: &Communicator) -> Result<String, RemoteError>;

    async fn update_communicator(&self, communicator: &Communicator) -> Result<(), RemoteError>;
}

/// Client used when no remote API is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineClient;

impl OfflineClient {
    fn offline() -> RemoteError {
        RemoteError::Network("no remote API configured".into())
    }
}

#[async_trait::async_trait]
impl RemoteBoardClient for OfflineClient {
    async fn fetch_board(&self, _id: &str) -> Result<Board, RemoteError> {
        Err(Self::offline())
    }

    async fn create_board(&self, _board: &Board) -> Result<BoardId, RemoteError> {
        Err(Self::offline())
    }

    async fn update_board(&self, _board: &Board) -> Result<Board, RemoteError> {
        Err(Self::offline())
    }

    async fn delete_board(&self, _id: &str) -> Result<(), RemoteError> {
        Err(Self::offline())
    }

    async fn create_communicator(&self, _communicator: &Communicator) -> Result<String, RemoteError> {
        Err(Self::offline())
    }

    async fn update_communicator(&self, _communicator: &Communicator) -> Result<(), RemoteError> {
        Err(Self::offline())
    }
}
