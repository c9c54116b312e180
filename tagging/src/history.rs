//! Historical tags from a paginated event table.
//!
//! A single page is never enough once the table outgrows the page size, so
//! loading keeps requesting pages until one comes back short.

use crate::analytics::temporal::{PairingConfig, PossessionEvent};
use crate::model::{Tag, TagId};
use crate::sync::wire::{decode_tags, encode_tag};
use matchtag_core::table::{EventTable, TableError};
use serde_json::Value;
use std::collections::HashSet;

/// Default table holding historical tags.
pub const TAGS_TABLE: &str = "tags";

/// Every row of `table`, in table order.
///
/// # Errors
///
/// Returns the first [`TableError`] raised by a page request; rows already
/// read are discarded.
pub async fn load_rows(
    events: &dyn EventTable,
    table: &str,
    page_size: usize,
) -> Result<Vec<Value>, TableError> {
    let page_size = page_size.max(1);
    let mut rows = Vec::new();

    loop {
        let page = events.fetch_page(table, rows.len(), page_size).await?;
        let short = page.len() < page_size;
        rows.extend(page);
        if short {
            break;
        }
    }

    tracing::debug!(table, rows = rows.len(), "Loaded history");
    Ok(rows)
}

/// Every decodable tag of `table`. Rows that are not valid tags are dropped.
///
/// # Errors
///
/// Returns the first [`TableError`] raised by a page request.
pub async fn load_tags(
    events: &dyn EventTable,
    table: &str,
    page_size: usize,
) -> Result<Vec<Tag>, TableError> {
    let rows = load_rows(events, table, page_size).await?;
    Ok(decode_tags(&rows))
}

/// Possession events from rows of `table` that carry a usable time.
///
/// # Errors
///
/// Returns the first [`TableError`] raised by a page request.
pub async fn load_possession_events(
    events: &dyn EventTable,
    table: &str,
    page_size: usize,
    config: &PairingConfig,
) -> Result<Vec<PossessionEvent>, TableError> {
    let rows = load_rows(events, table, page_size).await?;
    Ok(rows
        .iter()
        .filter_map(|row| PossessionEvent::from_row(row, config))
        .collect())
}

/// Write `tags` into `table`, replacing rows with the same id.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns the first [`TableError`]; tags before it are already written.
pub async fn archive_tags(
    events: &dyn EventTable,
    table: &str,
    tags: &[Tag],
) -> Result<usize, TableError> {
    for tag in tags {
        let row = encode_tag(tag).map_err(|e| TableError::Serialization(e.to_string()))?;
        if events.delete(table, tag.id.as_str()).await? {
            tracing::debug!(tag = %tag.id, "Replacing archived tag");
        }
        events.insert(table, row).await?;
    }
    tracing::info!(table, tags = tags.len(), "Archived tags");
    Ok(tags.len())
}

/// Live tags followed by historical tags whose id is not live.
#[must_use]
pub fn merge_with_live(history: &[Tag], live: &[Tag]) -> Vec<Tag> {
    let live_ids: HashSet<&TagId> = live.iter().map(|t| &t.id).collect();
    live.iter()
        .chain(history.iter().filter(|t| !live_ids.contains(&t.id)))
        .cloned()
        .collect()
}
