use crate::board::{Board, ColumnRole, ColumnRoleMap, Item, resolve_roles};
use crate::calendar::Clock;
use crate::config::EngineConfig;
use crate::store::{ItemFilter, RecordStore, StoreError};
use crate::week_status::{DONE_STATUS, WeekStatus, classify, parse_deadline, parse_deadline_value};
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The target column already shows the computed label.
    Unchanged,
    /// A reactive event touched a column that does not feed the classifier.
    UnrelatedColumn,
    MissingTargetColumn,
}

/// Per-item result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Updated {
        previous: Option<String>,
        new: WeekStatus,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
    },
}

impl ItemOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        ItemOutcome::Skipped { reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub item_id: String,
    pub item_name: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BoardStatus {
    Succeeded,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardOutcome {
    pub board_id: String,
    pub board_name: Option<String>,
    #[serde(flatten)]
    pub status: BoardStatus,
    pub total_items: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Role titles not found on the board. Non-empty on a succeeded board
    /// means reconciliation ran with defaults for those roles.
    pub missing_columns: Vec<String>,
    pub items: Vec<ItemReport>,
}

impl BoardOutcome {
    fn succeeded(board_id: &str, board: &Board, missing_columns: Vec<String>) -> Self {
        Self {
            board_id: board_id.to_string(),
            board_name: Some(board.name.clone()),
            status: BoardStatus::Succeeded,
            total_items: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            missing_columns,
            items: Vec::new(),
        }
    }

    fn failed(board_id: &str, board_name: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            board_id: board_id.to_string(),
            board_name,
            status: BoardStatus::Failed {
                reason: reason.into(),
            },
            total_items: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            missing_columns: Vec::new(),
            items: Vec::new(),
        }
    }

    fn record(&mut self, item: &Item, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Updated { .. } => self.updated += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.total_items += 1;
        self.items.push(ItemReport {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            outcome,
        });
    }

    pub fn is_success(&self) -> bool {
        self.status == BoardStatus::Succeeded
    }
}

/// One failure anywhere in a sweep. `item_id` is `None` for board-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepError {
    pub board_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub boards: Vec<BoardOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<SweepError>,
}

impl SweepSummary {
    pub fn from_boards(started_at: DateTime<Utc>, duration_ms: u64, boards: Vec<BoardOutcome>) -> Self {
        let mut errors = Vec::new();
        for board in &boards {
            if let BoardStatus::Failed { reason } = &board.status {
                errors.push(SweepError {
                    board_id: board.board_id.clone(),
                    item_id: None,
                    error: reason.clone(),
                });
            }
            for report in &board.items {
                if let ItemOutcome::Failed { error } = &report.outcome {
                    errors.push(SweepError {
                        board_id: board.board_id.clone(),
                        item_id: Some(report.item_id.clone()),
                        error: error.clone(),
                    });
                }
            }
        }
        let succeeded = boards.iter().filter(|board| board.is_success()).count();
        let failed = boards.len() - succeeded;
        Self {
            started_at,
            duration_ms,
            boards,
            succeeded,
            failed,
            errors,
        }
    }

    pub fn items_updated(&self) -> usize {
        self.boards.iter().map(|board| board.updated).sum()
    }

    pub fn items_skipped(&self) -> usize {
        self.boards.iter().map(|board| board.skipped).sum()
    }

    pub fn items_failed(&self) -> usize {
        self.boards.iter().map(|board| board.failed).sum()
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("boards={}", self.boards.len()));
        parts.push(format!("ok={}", self.succeeded));
        parts.push(format!("failed={}", self.failed));
        parts.push(format!("updated={}", self.items_updated()));
        parts.push(format!("skipped={}", self.items_skipped()));
        if self.items_failed() > 0 {
            parts.push(format!("item_errors={}", self.items_failed()));
        }
        parts.push(format!("took={}ms", self.duration_ms));
        parts.join(", ")
    }
}

/// A single field change reported by the trigger layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChangeEvent {
    pub board_id: String,
    pub item_id: String,
    pub column_id: String,
    /// Raw new value as sent by the trigger, when it carried one.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// Drives the classifier over records and writes labels that changed.
///
/// Stateless between runs: boards and items are fetched fresh on every call.
/// There is no locking, so a reactive event and a sweep touching the same
/// item concurrently may both write.
pub struct Reconciler<S> {
    store: S,
    config: EngineConfig,
    clock: Clock,
}

impl<S: RecordStore> Reconciler<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    fn item_deadline(&self, roles: &ColumnRoleMap, item: &Item) -> Option<NaiveDate> {
        let raw = roles.deadline_id().and_then(|id| item.raw_value(id))?;
        parse_deadline(raw).unwrap_or_else(|err| {
            warn!(item_id = %item.id, %err, "treating deadline as absent");
            None
        })
    }

    fn event_deadline(&self, event: &ColumnChangeEvent, value: &serde_json::Value) -> Option<NaiveDate> {
        parse_deadline_value(value).unwrap_or_else(|err| {
            warn!(item_id = %event.item_id, %err, "treating event deadline as absent");
            None
        })
    }

    /// Single-item path: compute the label and write it only when it differs
    /// from what the target column shows. Store failures are returned.
    pub async fn reconcile_item(
        &self,
        board: &Board,
        roles: &ColumnRoleMap,
        item: &Item,
    ) -> Result<ItemOutcome, StoreError> {
        let deadline = self.item_deadline(roles, item);
        self.apply(board, roles, item, deadline).await
    }

    async fn apply(
        &self,
        board: &Board,
        roles: &ColumnRoleMap,
        item: &Item,
        deadline: Option<NaiveDate>,
    ) -> Result<ItemOutcome, StoreError> {
        let status = roles.status_id().and_then(|id| item.text(id));
        let new = classify(deadline, status, self.clock.today());
        let label = new.to_label();

        let current = item
            .text(&roles.target.id)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string);
        if current.as_deref() == Some(label.label.as_str()) {
            debug!(item_id = %item.id, label = %label.label, "week assignment unchanged");
            return Ok(ItemOutcome::skipped(SkipReason::Unchanged));
        }

        self.store
            .set_column_value(&board.id, &item.id, &roles.target.id, &label)
            .await?;
        info!(
            board_id = %board.id,
            item_id = %item.id,
            item = %item.name,
            previous = current.as_deref().unwrap_or("Not set"),
            new = %new,
            "updated week assignment"
        );
        Ok(ItemOutcome::Updated {
            previous: current,
            new,
        })
    }

    /// Reactive path for a single field change.
    ///
    /// Only deadline and status changes are acted on. When the deadline
    /// changed, the event's value is used instead of re-reading the column.
    pub async fn handle_column_change(&self, event: &ColumnChangeEvent) -> Result<ItemOutcome, StoreError> {
        let board = self.store.get_board(&event.board_id).await?;
        let roles = match resolve_roles(&board, &self.config.columns) {
            Ok(roles) => roles,
            Err(missing) => {
                warn!(board_id = %board.id, %missing, "no target column, ignoring event");
                return Ok(ItemOutcome::skipped(SkipReason::MissingTargetColumn));
            }
        };

        let event_deadline = match roles.role_of_column(&event.column_id) {
            Some(ColumnRole::Deadline) => event
                .value
                .as_ref()
                .map(|value| self.event_deadline(event, value)),
            Some(ColumnRole::Status) => None,
            _ => {
                debug!(column_id = %event.column_id, "column does not affect week assignment");
                return Ok(ItemOutcome::skipped(SkipReason::UnrelatedColumn));
            }
        };

        let item = self.store.get_item(&event.board_id, &event.item_id).await?;
        let deadline = match event_deadline {
            Some(deadline) => deadline,
            None => self.item_deadline(&roles, &item),
        };
        self.apply(&board, &roles, &item, deadline).await
    }

    async fn fetch_items(&self, board_id: &str, roles: &ColumnRoleMap) -> Result<Vec<Item>, StoreError> {
        if let Some(status_id) = roles.status_id() {
            let filter = ItemFilter::exclude_status(status_id, DONE_STATUS);
            match self.store.get_items(board_id, Some(&filter)).await {
                Ok(items) => return Ok(items),
                Err(err) => {
                    warn!(board_id, %err, "status filter failed, fetching all items");
                }
            }
        }
        self.store.get_items(board_id, None).await
    }

    /// Batch path for one board. Never fails: problems become a failed
    /// outcome for the board or for individual items.
    pub async fn update_board(&self, board_id: &str) -> BoardOutcome {
        info!(board_id, "processing board");
        let board = match self.store.get_board(board_id).await {
            Ok(board) => board,
            Err(err) => {
                error!(board_id, %err, "failed to load board");
                return BoardOutcome::failed(board_id, None, err.to_string());
            }
        };

        let roles = match resolve_roles(&board, &self.config.columns) {
            Ok(roles) => roles,
            Err(missing) => {
                warn!(board_id, board = %board.name, %missing, "board cannot be reconciled");
                let mut outcome = BoardOutcome::failed(
                    board_id,
                    Some(board.name.clone()),
                    format!("missing target column '{}'", self.config.columns.target),
                );
                outcome.missing_columns = missing.missing;
                return outcome;
            }
        };
        if !roles.missing.is_empty() {
            warn!(
                board_id,
                board = %board.name,
                missing = %roles.missing.join(", "),
                "board is missing columns, continuing with defaults"
            );
        }

        let items = match self.fetch_items(board_id, &roles).await {
            Ok(items) => items,
            Err(err) => {
                error!(board_id, %err, "failed to fetch items");
                let mut outcome = BoardOutcome::failed(board_id, Some(board.name.clone()), err.to_string());
                outcome.missing_columns = roles.missing.clone();
                return outcome;
            }
        };
        debug!(board_id, items = items.len(), "fetched active items");

        let mut outcome = BoardOutcome::succeeded(board_id, &board, roles.missing.clone());
        for item in &items {
            let result = match self.reconcile_item(&board, &roles, item).await {
                Ok(result) => result,
                Err(err) => {
                    error!(board_id, item_id = %item.id, item = %item.name, %err, "failed to update item");
                    ItemOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };
            outcome.record(item, result);
        }

        info!(
            board_id,
            board = %board.name,
            updated = outcome.updated,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "board processed"
        );
        outcome
    }

    /// Sweep every configured board, `board_concurrency` boards at a time.
    /// Board outcomes keep configuration order.
    pub async fn update_all_boards(&self) -> SweepSummary {
        let started_at = Utc::now();
        let timer = Instant::now();
        info!(boards = self.config.board_ids.len(), "starting week assignment sweep");

        let mut boards = Vec::with_capacity(self.config.board_ids.len());
        for batch in self.config.board_ids.chunks(self.config.board_concurrency.max(1)) {
            boards.extend(join_all(batch.iter().map(|board_id| self.update_board(board_id))).await);
        }

        let duration_ms = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);
        let summary = SweepSummary::from_boards(started_at, duration_ms, boards);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            duration_ms,
            "sweep completed"
        );
        if !summary.errors.is_empty() {
            warn!(errors = summary.errors.len(), "sweep finished with errors");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Column, ColumnValue};
    use crate::store::InMemoryStore;

    fn board(id: &str) -> Board {
        Board {
            id: id.to_string(),
            name: format!("Board {id}"),
            columns: vec![
                Column::new("date4", "Internal Deadline", "date"),
                Column::new("status", "Status", "status"),
                Column::new("week", "Week Assigned", "status"),
            ],
        }
    }

    fn item(id: &str, deadline: &str, status: &str) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Item {id}"),
            column_values: vec![
                ColumnValue::new("date4", Some(format!(r#"{{"date":"{deadline}"}}"#)), None),
                ColumnValue::new("status", None, Some(status.to_string())),
            ],
        }
    }

    // Wednesday 2025-01-08: a, b, c are this week, next week and past due
    fn seeded(board_ids: &[&str]) -> Reconciler<InMemoryStore> {
        let store = InMemoryStore::new();
        store.insert_board(board("1"));
        store.insert_item("1", item("a", "2025-01-10", "Working on it"));
        store.insert_item("1", item("b", "2025-01-14", "Stuck"));
        store.insert_item("1", item("c", "2025-01-02", "Working on it"));
        store.insert_item("1", item("done", "2025-01-02", "Done"));
        let today = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        Reconciler::new(store, EngineConfig::with_boards(board_ids.iter().copied()))
            .with_clock(Clock::Fixed(today))
    }

    #[tokio::test]
    async fn failed_write_is_recorded_and_the_board_continues() {
        let reconciler = seeded(&["1"]);
        reconciler.store().fail_writes_for("b");

        let summary = reconciler.update_all_boards().await;

        let outcome = &summary.boards[0];
        assert!(outcome.is_success());
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].item_id.as_deref(), Some("b"));
        assert!(summary.to_cli_summary().contains("item_errors=1"));
        let written: Vec<String> = reconciler
            .store()
            .writes()
            .into_iter()
            .map(|write| write.item_id)
            .collect();
        assert_eq!(written, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn rejected_filter_falls_back_to_all_items() {
        let reconciler = seeded(&["1"]);
        reconciler.store().reject_filtered_queries();

        let outcome = reconciler.update_board("1").await;

        assert!(outcome.is_success());
        assert_eq!(reconciler.store().filtered_query_count(), 1);
        assert_eq!(outcome.total_items, 4);
        let done = outcome.items.iter().find(|report| report.item_id == "done").unwrap();
        assert!(matches!(done.outcome, ItemOutcome::Updated { new: WeekStatus::Completed, .. }));
    }

    #[tokio::test]
    async fn unknown_and_unreadable_boards_do_not_stop_the_sweep() {
        let reconciler = seeded(&["404", "5", "1"]);
        reconciler.store().insert_board(board("5"));
        reconciler.store().fail_reads_for("5");

        let summary = reconciler.update_all_boards().await;

        let ids: Vec<&str> = summary.boards.iter().map(|board| board.board_id.as_str()).collect();
        assert_eq!(ids, vec!["404", "5", "1"]);
        assert!(matches!(&summary.boards[0].status, BoardStatus::Failed { reason } if reason.contains("not found")));
        assert_eq!(summary.boards[0].board_name, None);
        assert!(!summary.boards[1].is_success());
        assert_eq!(summary.boards[1].board_name.as_deref(), Some("Board 5"));
        assert!(summary.boards[2].is_success());
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.errors.len(), 2);
    }
}
