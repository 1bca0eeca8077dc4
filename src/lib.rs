pub mod board;
pub mod calendar;
pub mod config;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod logging;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod week_status;

pub use board::{Board, Column, ColumnRole, ColumnRoleMap, ColumnRoleNames, ColumnValue, Item, MissingColumn, resolve_roles};
pub use calendar::{Clock, WeekWindow};
pub use config::{ConfigError, EngineConfig, StoreConfig, SyncConfig};
pub use reconcile::{
    BoardOutcome, BoardStatus, ColumnChangeEvent, ItemOutcome, ItemReport, Reconciler, SkipReason, SweepError,
    SweepSummary,
};
pub use store::{InMemoryStore, ItemFilter, MondayClient, RecordStore, StoreError};
pub use week_status::{MalformedValue, StatusLabel, WeekStatus, classify, format_status_label, parse_deadline};
