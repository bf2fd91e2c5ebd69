use crate::error::{ForgeError, ForgeResult};
use serde_json::Value;
use shared::models::LorebookEntry;

/// Where entries live, in lookup order: V2/V3 card, legacy card, world book.
const ENTRY_PATHS: &[&[&str]] = &[
    &["data", "character_book", "entries"],
    &["character_book", "entries"],
    &["entries"],
];

fn looks_like_entries(items: &[Value]) -> bool {
    items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|first| first.contains_key("keys") && first.contains_key("content"))
}

fn entries_at<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    path.iter()
        .try_fold(document, |node, key| node.get(key))
        .and_then(Value::as_array)
}

/// Finds lorebook entries in an uploaded document, which may be a bare entry
/// array, a full card or a standalone world book.
///
/// `Ok(None)` when no entry list is present. Every entry is kept; one that
/// cannot be read fails the whole import with its index.
pub fn find_lorebook_entries(document: &Value) -> ForgeResult<Option<Vec<LorebookEntry>>> {
    let raw = match document.as_array() {
        Some(items) if looks_like_entries(items) => items,
        _ => match ENTRY_PATHS.iter().find_map(|path| entries_at(document, path)) {
            Some(items) => items,
            None => return Ok(None),
        },
    };

    let entries = raw
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone()).map_err(|e| {
                ForgeError::validation(format!("Lorebook entry {} could not be read: {}", index + 1, e))
            })
        })
        .collect::<ForgeResult<Vec<LorebookEntry>>>()?;
    Ok((!entries.is_empty()).then_some(entries))
}
