//! Pending offline mutation model

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Remote entity collection a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    User,
    Quiz,
    Score,
}

impl EntityType {
    /// Stable string form used in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Quiz => "QUIZ",
            Self::Score => "SCORE",
        }
    }

    /// Remote collection name for this entity type.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Quiz => "quizzes",
            Self::Score => "scores",
        }
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "USER" => Ok(Self::User),
            "QUIZ" => Ok(Self::Quiz),
            "SCORE" => Ok(Self::Score),
            other => Err(Error::InvalidInput(format!("Unknown entity type: {other}"))),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of mutation awaiting remote replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Stable string form used in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("Unknown operation: {other}"))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending offline mutation awaiting remote replay.
///
/// Entries are replayed in FIFO enqueue order and removed only after the
/// corresponding remote write is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    /// Unique entry identifier (UUID v7, time-sortable).
    pub entry_id: String,
    /// Remote entity collection targeted.
    pub entity_type: EntityType,
    /// Kind of mutation.
    pub operation: Operation,
    /// Entity data to replay.
    pub payload: JsonValue,
    /// Enqueue timestamp (Unix ms).
    pub enqueued_at: i64,
}

impl SyncQueueEntry {
    /// Create a new queue entry for a local mutation.
    #[must_use]
    pub fn new(entity_type: EntityType, operation: Operation, payload: JsonValue) -> Self {
        Self {
            entry_id: Uuid::now_v7().to_string(),
            entity_type,
            operation,
            payload,
            enqueued_at: crate::util::unix_timestamp_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entity_type_round_trips_through_str() {
        for entity in [EntityType::User, EntityType::Quiz, EntityType::Score] {
            assert_eq!(entity.as_str().parse::<EntityType>().unwrap(), entity);
        }
        assert!("LESSON".parse::<EntityType>().is_err());
    }

    #[test]
    fn operation_round_trips_through_str() {
        for op in [Operation::Create, Operation::Update, Operation::Delete] {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("UPSERT".parse::<Operation>().is_err());
    }

    #[test]
    fn entry_ids_are_unique() {
        let first = SyncQueueEntry::new(
            EntityType::Quiz,
            Operation::Create,
            serde_json::json!({"id": "q1"}),
        );
        let second = SyncQueueEntry::new(
            EntityType::Quiz,
            Operation::Update,
            serde_json::json!({"id": "q1"}),
        );

        assert_ne!(first.entry_id, second.entry_id);
    }

    #[test]
    fn sync_entry_serde_round_trip() {
        let entry = SyncQueueEntry::new(
            EntityType::Score,
            Operation::Create,
            serde_json::json!({"id": "s1", "value": 97}),
        );

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"SCORE\""));
        assert!(json.contains("\"CREATE\""));

        let parsed: SyncQueueEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
