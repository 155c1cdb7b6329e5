use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Games per history page, fixed by the service.
pub const GAMES_PER_PAGE: usize = 15;

/// Pagination block the service attaches to history pages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryPage {
    pub games: Vec<Value>,
    pub meta: PageMeta,
}

impl HistoryPage {
    /// Split a page body into its records (under `key`) and pagination meta.
    pub fn from_body(mut body: Value, key: &'static str) -> Result<Self> {
        let games = match body.get_mut(key).map(Value::take) {
            Some(Value::Array(games)) => games,
            _ => return Err(Error::MissingField(key)),
        };
        let meta = body
            .get_mut("meta")
            .map(Value::take)
            .ok_or(Error::MissingField("meta"))?;
        Ok(Self {
            games,
            meta: serde_json::from_value(meta)?,
        })
    }
}

/// Fetch up to `num_pages` pages starting at `start`, stopping early once the
/// service reports the last page. Pages are requested one after another.
pub fn collect_pages<F>(start: u32, num_pages: u32, mut fetch: F) -> Result<Vec<Value>>
where
    F: FnMut(u32) -> Result<HistoryPage>,
{
    let mut games = Vec::new();
    let mut page = start;
    for _ in 0..num_pages {
        tracing::debug!(page, "fetching history page");
        let fetched = fetch(page)?;
        games.extend(fetched.games);
        if page >= fetched.meta.total_pages {
            tracing::info!(page, total_pages = fetched.meta.total_pages, "reached last page");
            break;
        }
        page += 1;
    }
    Ok(games)
}
