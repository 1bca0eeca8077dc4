use super::{ItemFilter, RecordStore, StoreError, StoreResult};
use crate::board::{Board, ColumnValue, Item};
use crate::week_status::StatusLabel;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// A write accepted by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub board_id: String,
    pub item_id: String,
    pub column_id: String,
    pub value: StatusLabel,
}

#[derive(Debug, Default)]
struct BoardRecord {
    board: Option<Board>,
    items: Vec<Item>,
}

#[derive(Debug, Default)]
struct Inner {
    boards: HashMap<String, BoardRecord>,
    failing_writes: HashSet<String>,
    failing_reads: HashSet<String>,
    reject_filters: bool,
    writes: Vec<RecordedWrite>,
    filtered_queries: usize,
}

/// In-process record store. Writes are applied to the stored items, so a
/// second pass observes the values written by the first.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_board(&self, board: Board) {
        let mut inner = self.inner.write();
        let record = inner.boards.entry(board.id.clone()).or_default();
        record.board = Some(board);
    }

    pub fn insert_item(&self, board_id: &str, item: Item) {
        let mut inner = self.inner.write();
        let record = inner.boards.entry(board_id.to_string()).or_default();
        match record.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => record.items.push(item),
        }
    }

    pub fn item(&self, board_id: &str, item_id: &str) -> Option<Item> {
        let inner = self.inner.read();
        inner
            .boards
            .get(board_id)
            .and_then(|record| record.items.iter().find(|item| item.id == item_id))
            .cloned()
    }

    /// Every subsequent write to this item fails with a transport error.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_writes_for(&self, item_id: &str) {
        self.inner.write().failing_writes.insert(item_id.to_string());
    }

    /// Item listing for this board fails, filtered or not.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_reads_for(&self, board_id: &str) {
        self.inner.write().failing_reads.insert(board_id.to_string());
    }

    /// Filtered item queries fail; unfiltered ones still succeed.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reject_filtered_queries(&self) {
        self.inner.write().reject_filters = true;
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.inner.read().writes.clone()
    }

    pub fn filtered_query_count(&self) -> usize {
        self.inner.read().filtered_queries
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get_board(&self, board_id: &str) -> StoreResult<Board> {
        let inner = self.inner.read();
        inner
            .boards
            .get(board_id)
            .and_then(|record| record.board.clone())
            .ok_or_else(|| StoreError::not_found(format!("board {board_id}")))
    }

    async fn get_item(&self, board_id: &str, item_id: &str) -> StoreResult<Item> {
        self.item(board_id, item_id)
            .ok_or_else(|| StoreError::not_found(format!("item {item_id}")))
    }

    async fn get_items(&self, board_id: &str, filter: Option<&ItemFilter>) -> StoreResult<Vec<Item>> {
        let mut inner = self.inner.write();
        if inner.failing_reads.contains(board_id) {
            return Err(StoreError::Transport(format!(
                "items for board {board_id} unavailable"
            )));
        }
        if let Some(filter) = filter {
            inner.filtered_queries += 1;
            if inner.reject_filters {
                return Err(StoreError::Api(format!(
                    "filter on column {} rejected",
                    filter.status_column_id
                )));
            }
        }
        let record = inner
            .boards
            .get(board_id)
            .ok_or_else(|| StoreError::not_found(format!("board {board_id}")))?;
        Ok(record
            .items
            .iter()
            .filter(|item| filter.is_none_or(|filter| !filter.excludes(item)))
            .cloned()
            .collect())
    }

    async fn set_column_value(
        &self,
        board_id: &str,
        item_id: &str,
        column_id: &str,
        value: &StatusLabel,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.failing_writes.contains(item_id) {
            return Err(StoreError::Transport(format!(
                "write to item {item_id} failed"
            )));
        }
        let item = inner
            .boards
            .get_mut(board_id)
            .and_then(|record| record.items.iter_mut().find(|item| item.id == item_id))
            .ok_or_else(|| StoreError::not_found(format!("item {item_id}")))?;
        item.set_cell(ColumnValue::new(
            column_id,
            Some(serde_json::to_string(value)?),
            Some(value.label.clone()),
        ));
        inner.writes.push(RecordedWrite {
            board_id: board_id.to_string(),
            item_id: item_id.to_string(),
            column_id: column_id.to_string(),
            value: value.clone(),
        });
        Ok(())
    }
}
