use crate::board::{Board, Item};
use crate::week_status::StatusLabel;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            StoreError::InvalidResponse(value.to_string())
        } else {
            StoreError::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::InvalidResponse(value.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Server-side item filter: drop items whose status column text is any of
/// `excluded_labels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub status_column_id: String,
    pub excluded_labels: Vec<String>,
}

impl ItemFilter {
    pub fn exclude_status(status_column_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            status_column_id: status_column_id.into(),
            excluded_labels: vec![label.into()],
        }
    }

    pub fn excludes(&self, item: &Item) -> bool {
        item.text(&self.status_column_id)
            .is_some_and(|text| self.excluded_labels.iter().any(|label| label == text))
    }
}

/// Minimal read/write surface of the upstream task tracker.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails with [`StoreError::NotFound`] when the board does not exist.
    async fn get_board(&self, board_id: &str) -> StoreResult<Board>;

    async fn get_item(&self, board_id: &str, item_id: &str) -> StoreResult<Item>;

    /// All items on the board, paginated internally up to the adapter's page cap.
    async fn get_items(&self, board_id: &str, filter: Option<&ItemFilter>) -> StoreResult<Vec<Item>>;

    /// Single-field write. There is no batch or transactional primitive.
    async fn set_column_value(
        &self,
        board_id: &str,
        item_id: &str,
        column_id: &str,
        value: &StatusLabel,
    ) -> StoreResult<()>;
}

pub mod memory;
pub mod monday;

pub use memory::{InMemoryStore, RecordedWrite};
pub use monday::MondayClient;
