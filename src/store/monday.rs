//! GraphQL adapter for the monday.com API.
//!
//! Every call is a single POST with the raw API token in `Authorization`.
//! There is no retry loop; failures surface as [`StoreError`] and the engine
//! decides how far they propagate.

use super::{ItemFilter, RecordStore, StoreError, StoreResult};
use crate::board::{Board, Column, ColumnValue, Item};
use crate::config::StoreConfig;
use crate::week_status::StatusLabel;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::future::Future;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.monday.com/v2";

const ITEM_FIELDS: &str = "id name column_values { id value text }";

pub struct MondayClient {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    page_size: u32,
    max_pages: u32,
}

impl MondayClient {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_token: api_token.into(),
            page_size: 500,
            max_pages: 20,
        }
    }

    /// Build from configuration. Returns `None` when no token is configured.
    pub fn from_config(config: &StoreConfig) -> Option<Self> {
        let token = config.api_token.as_ref()?;
        Some(Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_token: token.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
        })
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> StoreResult<T> {
        let body = json!({ "query": query, "variables": variables });
        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", self.api_token.clone())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!("HTTP {status}: {text}")));
        }

        let envelope: Value = resp.json().await?;
        decode_envelope(envelope)
    }

    /// Boards visible to the token, with their columns.
    pub async fn list_boards(&self, limit: u32) -> StoreResult<Vec<Board>> {
        let query = r#"
            query($limit: Int!) {
                boards(limit: $limit) {
                    id name columns { id title type }
                }
            }
        "#;
        let data: BoardsData = self.graphql(query, json!({ "limit": limit })).await?;
        Ok(data.boards.into_iter().map(Board::from).collect())
    }

    async fn first_page(&self, board_id: &str, filter: Option<&ItemFilter>) -> StoreResult<ItemsPage> {
        let data: BoardItemsData = match filter {
            Some(filter) => {
                let query = format!(
                    r#"
                    query($boardId: ID!, $limit: Int!, $queryParams: ItemsQuery) {{
                        boards(ids: [$boardId]) {{
                            items_page(limit: $limit, query_params: $queryParams) {{
                                cursor items {{ {ITEM_FIELDS} }}
                            }}
                        }}
                    }}
                    "#
                );
                let variables = json!({
                    "boardId": board_id,
                    "limit": self.page_size,
                    "queryParams": filter_params(filter),
                });
                self.graphql(&query, variables).await?
            }
            None => {
                let query = format!(
                    r#"
                    query($boardId: ID!, $limit: Int!) {{
                        boards(ids: [$boardId]) {{
                            items_page(limit: $limit) {{
                                cursor items {{ {ITEM_FIELDS} }}
                            }}
                        }}
                    }}
                    "#
                );
                let variables = json!({ "boardId": board_id, "limit": self.page_size });
                self.graphql(&query, variables).await?
            }
        };
        data.boards
            .into_iter()
            .next()
            .map(|board| board.items_page)
            .ok_or_else(|| StoreError::not_found(format!("board {board_id}")))
    }

    async fn next_page(&self, cursor: &str) -> StoreResult<ItemsPage> {
        let query = format!(
            r#"
            query($cursor: String!, $limit: Int!) {{
                next_items_page(cursor: $cursor, limit: $limit) {{
                    cursor items {{ {ITEM_FIELDS} }}
                }}
            }}
            "#
        );
        let data: NextPageData = self
            .graphql(&query, json!({ "cursor": cursor, "limit": self.page_size }))
            .await?;
        Ok(data.next_items_page)
    }
}

#[async_trait]
impl RecordStore for MondayClient {
    async fn get_board(&self, board_id: &str) -> StoreResult<Board> {
        let query = r#"
            query($boardId: ID!) {
                boards(ids: [$boardId]) {
                    id name columns { id title type }
                }
            }
        "#;
        let data: BoardsData = self.graphql(query, json!({ "boardId": board_id })).await?;
        data.boards
            .into_iter()
            .next()
            .map(Board::from)
            .ok_or_else(|| StoreError::not_found(format!("board {board_id}")))
    }

    async fn get_item(&self, _board_id: &str, item_id: &str) -> StoreResult<Item> {
        let query = format!(
            r#"
            query($itemId: ID!) {{
                items(ids: [$itemId]) {{ {ITEM_FIELDS} }}
            }}
            "#
        );
        let data: ItemsData = self.graphql(&query, json!({ "itemId": item_id })).await?;
        data.items
            .into_iter()
            .next()
            .map(Item::from)
            .ok_or_else(|| StoreError::not_found(format!("item {item_id}")))
    }

    async fn get_items(&self, board_id: &str, filter: Option<&ItemFilter>) -> StoreResult<Vec<Item>> {
        let first = self.first_page(board_id, filter).await?;
        collect_pages(board_id, first, self.max_pages, move |cursor| async move {
            self.next_page(&cursor).await
        })
        .await
    }

    async fn set_column_value(
        &self,
        board_id: &str,
        item_id: &str,
        column_id: &str,
        value: &StatusLabel,
    ) -> StoreResult<()> {
        let mutation = r#"
            mutation($boardId: ID!, $itemId: ID!, $columnId: String!, $value: JSON!) {
                change_column_value(
                    board_id: $boardId,
                    item_id: $itemId,
                    column_id: $columnId,
                    value: $value
                ) { id }
            }
        "#;
        let variables = json!({
            "boardId": board_id,
            "itemId": item_id,
            "columnId": column_id,
            "value": serde_json::to_string(value)?,
        });
        let _: Value = self.graphql(mutation, variables).await?;
        Ok(())
    }
}

fn filter_params(filter: &ItemFilter) -> Value {
    json!({
        "rules": [{
            "column_id": filter.status_column_id,
            "compare_value": filter.excluded_labels,
            "operator": "not_any_of",
        }],
        "operator": "and",
    })
}

fn decode_envelope<T: DeserializeOwned>(envelope: Value) -> StoreResult<T> {
    if let Some(errors) = envelope.get("errors") {
        return Err(StoreError::Api(errors.to_string()));
    }
    let data = envelope
        .get("data")
        .cloned()
        .ok_or_else(|| StoreError::InvalidResponse("missing 'data' in response".to_string()))?;
    Ok(serde_json::from_value(data)?)
}

// Wire shapes. Ids come back as strings; cells may carry null value/text.

#[derive(Debug, Deserialize)]
struct BoardsData {
    boards: Vec<BoardNode>,
}

#[derive(Debug, Deserialize)]
struct BoardNode {
    id: String,
    name: String,
    #[serde(default)]
    columns: Vec<Column>,
}

impl From<BoardNode> for Board {
    fn from(node: BoardNode) -> Self {
        Board {
            id: node.id,
            name: node.name,
            columns: node.columns,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BoardItemsData {
    boards: Vec<BoardItemsNode>,
}

#[derive(Debug, Deserialize)]
struct BoardItemsNode {
    items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct NextPageData {
    next_items_page: ItemsPage,
}

/// Follow `next` from `first` until the cursor runs out or `max_pages`
/// pages have been read. Items already fetched are kept at the cap.
async fn collect_pages<F, Fut>(
    board_id: &str,
    first: ItemsPage,
    max_pages: u32,
    mut next: F,
) -> StoreResult<Vec<Item>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = StoreResult<ItemsPage>>,
{
    let mut page = first;
    let mut items: Vec<Item> = Vec::new();
    let mut pages_read = 1;
    loop {
        items.extend(page.items.into_iter().map(Item::from));
        let Some(cursor) = page.cursor else {
            break;
        };
        if pages_read >= max_pages {
            warn!(
                board_id,
                pages = pages_read,
                items = items.len(),
                "page cap reached, remaining items not fetched"
            );
            break;
        }
        page = next(cursor).await?;
        pages_read += 1;
    }
    debug!(board_id, pages = pages_read, items = items.len(), "fetched board items");
    Ok(items)
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    cursor: Option<String>,
    #[serde(default)]
    items: Vec<ItemNode>,
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    items: Vec<ItemNode>,
}

#[derive(Debug, Deserialize)]
struct ItemNode {
    id: String,
    name: String,
    #[serde(default)]
    column_values: Vec<CellNode>,
}

#[derive(Debug, Deserialize)]
struct CellNode {
    id: String,
    value: Option<String>,
    text: Option<String>,
}

impl From<ItemNode> for Item {
    fn from(node: ItemNode) -> Self {
        Item {
            id: node.id,
            name: node.name,
            column_values: node
                .column_values
                .into_iter()
                .map(|cell| ColumnValue::new(cell.id, cell.value, cell.text))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_errors_become_api_errors() {
        let envelope = json!({ "errors": [{ "message": "Column not found" }] });
        let err = decode_envelope::<BoardsData>(envelope).unwrap_err();
        assert!(matches!(err, StoreError::Api(ref msg) if msg.contains("Column not found")));
    }

    #[test]
    fn missing_data_is_an_invalid_response() {
        let err = decode_envelope::<BoardsData>(json!({ "account_id": 1 })).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }

    #[test]
    fn board_payload_decodes_columns_with_type() {
        let envelope = json!({
            "data": {
                "boards": [{
                    "id": "1001",
                    "name": "Delivery",
                    "columns": [
                        { "id": "date4", "title": "Internal Deadline", "type": "date" },
                        { "id": "status", "title": "Status", "type": "status" }
                    ]
                }]
            }
        });
        let data: BoardsData = decode_envelope(envelope).unwrap();
        let board = Board::from(data.boards.into_iter().next().unwrap());
        assert_eq!(board.columns.len(), 2);
        assert_eq!(board.columns[0].kind, "date");
        assert_eq!(board.column_by_title("Status").unwrap().id, "status");
    }

    #[test]
    fn items_page_decodes_null_cells_and_cursor() {
        let envelope = json!({
            "data": {
                "boards": [{
                    "items_page": {
                        "cursor": "MSw5NzI4MDA5MDAsaV9YcmxJb0p1VEdYc1VWeGlxeF9kLDg4MiwzNXw0MTQ1NzU1MTE5",
                        "items": [{
                            "id": "42",
                            "name": "Launch",
                            "column_values": [
                                { "id": "date4", "value": "{\"date\":\"2025-01-13\"}", "text": "2025-01-13" },
                                { "id": "week", "value": null, "text": null }
                            ]
                        }]
                    }
                }]
            }
        });
        let data: BoardItemsData = decode_envelope(envelope).unwrap();
        let page = data.boards.into_iter().next().unwrap().items_page;
        assert!(page.cursor.is_some());
        let item = Item::from(page.items.into_iter().next().unwrap());
        assert_eq!(item.raw_value("date4"), Some("{\"date\":\"2025-01-13\"}"));
        assert_eq!(item.text("week"), None);
    }

    #[test]
    fn status_filter_uses_not_any_of_rule() {
        let params = filter_params(&ItemFilter::exclude_status("status", "Done"));
        assert_eq!(params["rules"][0]["operator"], json!("not_any_of"));
        assert_eq!(params["rules"][0]["compare_value"], json!(["Done"]));
        assert_eq!(params["rules"][0]["column_id"], json!("status"));
    }

    fn page(cursor: Option<&str>, ids: &[&str]) -> ItemsPage {
        ItemsPage {
            cursor: cursor.map(str::to_string),
            items: ids
                .iter()
                .map(|id| ItemNode {
                    id: id.to_string(),
                    name: format!("Item {id}"),
                    column_values: Vec::new(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn pagination_stops_when_cursor_is_null() {
        let mut requested = Vec::new();
        let items = collect_pages("1", page(Some("c1"), &["1", "2"]), 20, |cursor| {
            requested.push(cursor.clone());
            let next = match cursor.as_str() {
                "c1" => page(Some("c2"), &["3"]),
                _ => page(None, &["4"]),
            };
            async move { Ok(next) }
        })
        .await
        .unwrap();

        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(requested, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[tokio::test]
    async fn pagination_cap_keeps_items_already_read() {
        let mut calls = 0;
        let items = collect_pages("1", page(Some("c1"), &["1", "2"]), 2, |cursor| {
            calls += 1;
            let next = page(Some(format!("{cursor}+").as_str()), &["3"]);
            async move { Ok(next) }
        })
        .await
        .unwrap();

        assert_eq!(calls, 1);
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn pagination_error_on_later_page_propagates() {
        let result = collect_pages("1", page(Some("c1"), &["1"]), 20, |_cursor| async {
            Err(StoreError::Transport("connection reset".to_string()))
        })
        .await;
        assert!(matches!(result, Err(StoreError::Transport(_))));
    }
}
