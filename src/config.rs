use crate::board::ColumnRoleNames;
use crate::store::monday::DEFAULT_API_URL;
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_SWEEP_CRON: &str = "0 6 * * *";
const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3001";
const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid {key} '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Record store connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            page_size: MAX_PAGE_SIZE,
            max_pages: 20,
        }
    }
}

/// Settings handed to the reconciliation engine at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub board_ids: Vec<String>,
    pub columns: ColumnRoleNames,
    /// Boards processed at once during a sweep. 1 means strictly sequential.
    pub board_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_ids: Vec::new(),
            columns: ColumnRoleNames::default(),
            board_concurrency: 1,
        }
    }
}

impl EngineConfig {
    pub fn with_boards<I, S>(board_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            board_ids: board_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub store: StoreConfig,
    pub engine: EngineConfig,
    /// Five-field cron expression; `None` disables scheduled sweeps.
    pub sweep_cron: Option<String>,
    /// Zone used for "today" and the sweep schedule. `None` means host local
    /// time for "today" and UTC for the schedule.
    pub timezone: Option<Tz>,
    pub http_addr: SocketAddr,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = ColumnRoleNames::default();
        let columns = ColumnRoleNames {
            deadline: get("WEEK_SYNC_DEADLINE_COLUMN").unwrap_or(defaults.deadline),
            target: get("WEEK_SYNC_TARGET_COLUMN").unwrap_or(defaults.target),
            status: get("WEEK_SYNC_STATUS_COLUMN").unwrap_or(defaults.status),
        };

        let page_size = parse_number("WEEK_SYNC_PAGE_SIZE", get("WEEK_SYNC_PAGE_SIZE"), MAX_PAGE_SIZE)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::invalid(
                "WEEK_SYNC_PAGE_SIZE",
                page_size.to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        let max_pages = parse_number("WEEK_SYNC_MAX_PAGES", get("WEEK_SYNC_MAX_PAGES"), 20)?;
        if max_pages == 0 {
            return Err(ConfigError::invalid("WEEK_SYNC_MAX_PAGES", "0", "must be at least 1"));
        }
        let board_concurrency: usize =
            parse_number("WEEK_SYNC_BOARD_CONCURRENCY", get("WEEK_SYNC_BOARD_CONCURRENCY"), 1)?;
        if board_concurrency == 0 {
            return Err(ConfigError::invalid(
                "WEEK_SYNC_BOARD_CONCURRENCY",
                "0",
                "must be at least 1",
            ));
        }

        let sweep_cron = match get("WEEK_SYNC_CRON") {
            Some(value) if value.eq_ignore_ascii_case("off") => None,
            Some(value) => Some(value),
            None => Some(DEFAULT_SWEEP_CRON.to_string()),
        };

        let timezone = get("WEEK_SYNC_TIMEZONE")
            .map(|value| {
                Tz::from_str(&value)
                    .map_err(|_| ConfigError::invalid("WEEK_SYNC_TIMEZONE", value, "unknown IANA zone"))
            })
            .transpose()?;

        Ok(Self {
            store: StoreConfig {
                api_url: get("MONDAY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                api_token: get("MONDAY_API_TOKEN"),
                page_size,
                max_pages,
            },
            engine: EngineConfig {
                board_ids: get("MONDAY_BOARD_IDS")
                    .map(|ids| parse_board_ids(&ids))
                    .unwrap_or_default(),
                columns,
                board_concurrency,
            },
            sweep_cron,
            timezone,
            http_addr: http_addr(get("WEEK_SYNC_HTTP_ADDR"), get("PORT"))?,
        })
    }
}

/// Comma-separated list; whitespace trimmed, empty entries dropped.
pub fn parse_board_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_number<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::invalid(key, value, "expected a non-negative integer")),
        None => Ok(default),
    }
}

fn http_addr(addr: Option<String>, port: Option<String>) -> Result<SocketAddr, ConfigError> {
    if let Some(addr) = addr {
        return addr
            .parse()
            .map_err(|_| ConfigError::invalid("WEEK_SYNC_HTTP_ADDR", addr, "expected host:port"));
    }
    let mut socket: SocketAddr = DEFAULT_HTTP_ADDR
        .parse()
        .map_err(|_| ConfigError::invalid("WEEK_SYNC_HTTP_ADDR", DEFAULT_HTTP_ADDR, "expected host:port"))?;
    if let Some(port) = port {
        let port: u16 = parse_number("PORT", Some(port), 0)?;
        socket.set_port(port);
    }
    Ok(socket)
}
