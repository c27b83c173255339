//! Cursor (keyset) and offset pagination shared by every listing endpoint.
//!
//! A cursor is the sort key of the last row a client has seen, serialized to
//! JSON and wrapped in URL-safe base64 so clients treat it as opaque. The next
//! page is everything strictly past that key in the listing's order, which
//! keeps pages stable while rows are inserted ahead of the reader.

use std::cmp::Ordering;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Post};
use crate::{AppError, Result};

// Validation constants
pub const DEFAULT_LIMIT: u32 = 20;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 50;
pub const MAX_OFFSET: u32 = 10000;

/// Sort requested by clients for post listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    New,
    Top,
}

/// Every keyset order the API serves. Tagged into the cursor so a cursor
/// from one listing order is rejected by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// created_at DESC, id DESC
    #[serde(rename = "new")]
    Newest,
    /// score DESC, created_at DESC, id DESC. The cursor keeps the score a row had
    /// when its page was served, so votes landing between pages can skip or repeat it.
    #[serde(rename = "top")]
    TopScore,
    /// created_at ASC, id ASC
    #[serde(rename = "old")]
    Oldest,
}

impl From<PostSort> for SortOrder {
    fn from(sort: PostSort) -> Self {
        match sort {
            PostSort::New => SortOrder::Newest,
            PostSort::Top => SortOrder::TopScore,
        }
    }
}

/// Position of the last row served. `score` is a snapshot, not a live value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorKey {
    #[serde(rename = "o")]
    pub order: SortOrder,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(rename = "t")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "i")]
    pub id: Uuid,
}

impl CursorKey {
    pub fn new(order: SortOrder, score: i64, created_at: DateTime<Utc>, id: Uuid) -> Self {
        let score = (order == SortOrder::TopScore).then_some(score);
        Self { order, score, created_at, id }
    }

    pub fn encode(&self) -> String {
        // Serializing plain scalars into JSON cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(raw: &str, expected: SortOrder) -> Result<Self> {
        let invalid = || AppError::ValidationError("Invalid cursor".to_string());

        let bytes = URL_SAFE_NO_PAD.decode(raw.trim()).map_err(|_| invalid())?;
        let key: CursorKey = serde_json::from_slice(&bytes).map_err(|_| invalid())?;

        if key.order != expected {
            return Err(AppError::ValidationError(
                "Cursor does not belong to this sort order".to_string(),
            ));
        }
        if key.order == SortOrder::TopScore && key.score.is_none() {
            return Err(invalid());
        }
        Ok(key)
    }

    /// Position of `self` relative to `other` in the listing order:
    /// `Less` means `self` is listed first.
    pub fn position_cmp(&self, other: &CursorKey) -> Ordering {
        match self.order {
            SortOrder::Newest => (other.created_at, other.id).cmp(&(self.created_at, self.id)),
            SortOrder::TopScore => (other.score, other.created_at, other.id)
                .cmp(&(self.score, self.created_at, self.id)),
            SortOrder::Oldest => (self.created_at, self.id).cmp(&(other.created_at, other.id)),
        }
    }

    /// True when a row with this key belongs on a page requested after `cursor`
    pub fn is_past(&self, cursor: &CursorKey) -> bool {
        self.position_cmp(cursor) == Ordering::Greater
    }
}

/// Anything that can be listed with keyset pagination
pub trait Keyed {
    fn cursor_key(&self, order: SortOrder) -> CursorKey;
}

impl Keyed for Post {
    fn cursor_key(&self, order: SortOrder) -> CursorKey {
        CursorKey::new(order, self.score, self.created_at, self.id)
    }
}

impl Keyed for Comment {
    fn cursor_key(&self, order: SortOrder) -> CursorKey {
        CursorKey::new(order, self.score, self.created_at, self.id)
    }
}

/// Query string for cursor-paginated listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorParams {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// Validated keyset request handed to repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetPage {
    pub order: SortOrder,
    pub limit: u32,
    pub after: Option<CursorKey>,
}

impl KeysetPage {
    pub fn first(order: SortOrder, limit: u32) -> Self {
        Self { order, limit, after: None }
    }

    /// Rows a repository should fetch: one extra to detect a following page
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.limit) + 1
    }
}

impl CursorParams {
    pub fn into_keyset(self, order: SortOrder) -> Result<KeysetPage> {
        let limit = validate_limit(self.limit)?;
        let after = self
            .cursor
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| CursorKey::decode(raw, order))
            .transpose()?;
        Ok(KeysetPage { order, limit, after })
    }
}

/// Query string for offset-paginated listings
#[derive(Debug, Clone, Deserialize)]
pub struct OffsetParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Default for OffsetParams {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, offset: 0 }
    }
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl OffsetParams {
    pub fn validate(&self) -> Result<()> {
        validate_limit(Some(self.limit))?;
        if self.offset > MAX_OFFSET {
            return Err(AppError::ValidationError(format!(
                "Invalid offset. Must be <= {}",
                MAX_OFFSET
            )));
        }
        Ok(())
    }
}

fn validate_limit(limit: Option<u32>) -> Result<u32> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::ValidationError(format!(
            "Invalid limit. Must be between {} and {}",
            MIN_LIMIT, MAX_LIMIT
        )));
    }
    Ok(limit)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T: Keyed> CursorPage<T> {
    /// Build a page from rows fetched with `page.fetch_limit()`
    pub fn from_rows(mut rows: Vec<T>, page: &KeysetPage) -> Self {
        let limit = page.limit as usize;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let next_cursor = if has_more {
            rows.last().map(|row| row.cursor_key(page.order).encode())
        } else {
            None
        };

        Self { items: rows, next_cursor, has_more }
    }
}

impl<T> CursorPage<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> CursorPage<U> {
        CursorPage {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

impl<T> OffsetPage<T> {
    pub fn new(items: Vec<T>, total: i64, params: &OffsetParams) -> Self {
        let has_more = i64::from(params.offset) + (items.len() as i64) < total;
        Self { items, total, limit: params.limit, offset: params.offset, has_more }
    }
}

/// Keyset selection over an in-memory collection: order, skip past the
/// cursor, and keep `fetch_limit` rows.
pub fn select_keyset<'a, T, I>(rows: I, page: &KeysetPage) -> Vec<T>
where
    T: Keyed + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut keyed: Vec<(CursorKey, &T)> = rows
        .into_iter()
        .map(|row| (row.cursor_key(page.order), row))
        .filter(|(key, _)| page.after.as_ref().map_or(true, |after| key.is_past(after)))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| a.position_cmp(b));
    keyed
        .into_iter()
        .take(page.fetch_limit() as usize)
        .map(|(_, row)| row.clone())
        .collect()
}
