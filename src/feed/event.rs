//! ChangeEvent — the closed, validated form of a feed delta.
//!
//! Backend payloads are duck-typed JSON. Everything entering the
//! synchronizer goes through [`parse_event`], which either produces one of
//! the three variants or a [`FeedError::Malformed`] that the caller logs
//! and drops. Nothing downstream ever trusts the wire shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FeedError, Result};
use crate::types::{ChangeKind, Entity};

use super::types::RawFeedEvent;

/// A validated row-level delta.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    /// A new row appeared.
    Inserted(T),
    /// An existing row changed. `old` is present only when the feed
    /// includes prior values.
    Updated { old: Option<T>, new: T },
    /// A row vanished. Only the key and the change's sequence survive.
    Deleted { id: String, sequence: i64 },
}

impl<T: Entity> ChangeEvent<T> {
    /// Identifier of the affected row.
    pub fn id(&self) -> &str {
        match self {
            Self::Inserted(record) => record.id(),
            Self::Updated { new, .. } => new.id(),
            Self::Deleted { id, .. } => id,
        }
    }

    /// Sequence marker used for the stale check. Inserts and updates carry
    /// it on the record itself; deletes use the feed's marker.
    pub fn sequence(&self) -> i64 {
        match self {
            Self::Inserted(record) => record.sequence(),
            Self::Updated { new, .. } => new.sequence(),
            Self::Deleted { sequence, .. } => *sequence,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Inserted(_) => ChangeKind::Inserted,
            Self::Updated { .. } => ChangeKind::Updated,
            Self::Deleted { .. } => ChangeKind::Deleted,
        }
    }
}

/// Validate a raw feed payload into a [`ChangeEvent`].
pub fn parse_event<T>(raw: &RawFeedEvent) -> Result<ChangeEvent<T>>
where
    T: Entity + DeserializeOwned,
{
    match raw.action.to_ascii_uppercase().as_str() {
        "INSERT" => {
            let new = require_payload(raw.new.as_ref(), "new", "INSERT")?;
            Ok(ChangeEvent::Inserted(parse_record(new)?))
        }
        "UPDATE" => {
            let new = require_payload(raw.new.as_ref(), "new", "UPDATE")?;
            // Old values are best-effort: feeds often send a partial row
            // (key columns only), which won't parse into T.
            let old = raw
                .old
                .as_ref()
                .and_then(|value| serde_json::from_value(value.clone()).ok());
            Ok(ChangeEvent::Updated {
                old,
                new: parse_record(new)?,
            })
        }
        "DELETE" => {
            let old = require_payload(raw.old.as_ref(), "old", "DELETE")?;
            Ok(ChangeEvent::Deleted {
                id: extract_id(old)?,
                sequence: raw.sequence,
            })
        }
        other => Err(FeedError::Malformed(format!(
            "unknown action \"{other}\""
        ))),
    }
}

fn require_payload<'a>(
    payload: Option<&'a Value>,
    field: &str,
    action: &str,
) -> Result<&'a Value> {
    payload.filter(|v| !v.is_null()).ok_or_else(|| {
        FeedError::Malformed(format!("{action} event missing \"{field}\" payload"))
    })
}

fn parse_record<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| FeedError::Malformed(format!("record failed to parse: {e}")))
}

/// Pull the row key out of a delete payload. Feeds with default replica
/// identity send only key columns, so the full record may not be present.
fn extract_id(old: &Value) -> Result<String> {
    match old.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(FeedError::Malformed(format!(
            "DELETE event has non-scalar \"id\": {other}"
        ))),
        None => Err(FeedError::Malformed(
            "DELETE event missing \"id\" in old payload".to_string(),
        )),
    }
}
