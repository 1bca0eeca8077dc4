use serde::{Deserialize, Serialize};

/// A column definition on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    /// Upstream column type (`date`, `status`, ...). Informational only.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub columns: Vec<Column>,
}

impl Board {
    /// Exact, case-sensitive title match.
    pub fn column_by_title(&self, title: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.title == title)
    }
}

/// One cell of an item: the raw JSON-encoded value plus its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValue {
    pub id: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ColumnValue {
    pub fn new(id: impl Into<String>, value: Option<String>, text: Option<String>) -> Self {
        Self {
            id: id.into(),
            value,
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_values: Vec<ColumnValue>,
}

impl Item {
    pub fn column_value(&self, column_id: &str) -> Option<&ColumnValue> {
        self.column_values.iter().find(|cell| cell.id == column_id)
    }

    pub fn raw_value(&self, column_id: &str) -> Option<&str> {
        self.column_value(column_id)
            .and_then(|cell| cell.value.as_deref())
    }

    pub fn text(&self, column_id: &str) -> Option<&str> {
        self.column_value(column_id)
            .and_then(|cell| cell.text.as_deref())
    }

    /// Replace (or add) a cell, as a successful write would upstream.
    pub fn set_cell(&mut self, cell: ColumnValue) {
        match self.column_values.iter_mut().find(|c| c.id == cell.id) {
            Some(existing) => *existing = cell,
            None => self.column_values.push(cell),
        }
    }
}

/// Semantic meaning bound to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Deadline,
    Target,
    Status,
}

/// Column titles used to bind roles. The target title is integrator-configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoleNames {
    pub deadline: String,
    pub target: String,
    pub status: String,
}

impl Default for ColumnRoleNames {
    fn default() -> Self {
        Self {
            deadline: "Internal Deadline".to_string(),
            target: "Week Assigned".to_string(),
            status: "Status".to_string(),
        }
    }
}

impl ColumnRoleNames {
    pub fn title(&self, role: ColumnRole) -> &str {
        match role {
            ColumnRole::Deadline => &self.deadline,
            ColumnRole::Target => &self.target,
            ColumnRole::Status => &self.status,
        }
    }

    /// Which role, if any, a column title binds to.
    pub fn role_of(&self, title: &str) -> Option<ColumnRole> {
        [ColumnRole::Deadline, ColumnRole::Target, ColumnRole::Status]
            .into_iter()
            .find(|role| self.title(*role) == title)
    }
}

/// Columns resolved once per board and passed by value into both the
/// reactive and batch paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoleMap {
    pub target: Column,
    pub deadline: Option<Column>,
    pub status: Option<Column>,
    /// Titles of optional roles that were not found. Reconciliation still
    /// proceeds with defaults for these.
    pub missing: Vec<String>,
}

impl ColumnRoleMap {
    pub fn deadline_id(&self) -> Option<&str> {
        self.deadline.as_ref().map(|column| column.id.as_str())
    }

    pub fn status_id(&self) -> Option<&str> {
        self.status.as_ref().map(|column| column.id.as_str())
    }

    pub fn role_of_column(&self, column_id: &str) -> Option<ColumnRole> {
        if self.target.id == column_id {
            Some(ColumnRole::Target)
        } else if self.deadline_id() == Some(column_id) {
            Some(ColumnRole::Deadline)
        } else if self.status_id() == Some(column_id) {
            Some(ColumnRole::Status)
        } else {
            None
        }
    }
}

/// The board lacks its target column and cannot be reconciled at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("board {board_id} is missing columns: {}", .missing.join(", "))]
pub struct MissingColumn {
    pub board_id: String,
    /// Every role title that did not match, target included.
    pub missing: Vec<String>,
}

pub fn resolve_roles(board: &Board, names: &ColumnRoleNames) -> Result<ColumnRoleMap, MissingColumn> {
    let deadline = board.column_by_title(&names.deadline).cloned();
    let target = board.column_by_title(&names.target).cloned();
    let status = board.column_by_title(&names.status).cloned();

    let mut missing = Vec::new();
    if deadline.is_none() {
        missing.push(names.deadline.clone());
    }
    if target.is_none() {
        missing.push(names.target.clone());
    }
    if status.is_none() {
        missing.push(names.status.clone());
    }

    match target {
        Some(target) => Ok(ColumnRoleMap {
            target,
            deadline,
            status,
            missing,
        }),
        None => Err(MissingColumn {
            board_id: board.id.clone(),
            missing,
        }),
    }
}
