//! Wire-shaped change events (spec §4.2/§6), tagged at the wire boundary per
//! Design Notes §9 ("keep metadata as a tagged tree at the wire boundary").
//! Directly analogous to the teacher's `VestigeEvent`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    MemoryCreated {
        module_id: String,
        memory_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    MemoryUpdated {
        module_id: String,
        memory_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    MemoryDeleted {
        module_id: String,
        memory_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    /// Terminal event emitted on graceful shutdown before closing the
    /// subscriber stream (spec §6 Subscriber transport).
    ServerShutdown {
        timestamp: DateTime<Utc>,
    },
}

impl ChangeEvent {
    pub fn memory_created(module_id: impl Into<String>, memory_id: Uuid) -> Self {
        ChangeEvent::MemoryCreated {
            module_id: module_id.into(),
            memory_id,
            timestamp: Utc::now(),
        }
    }

    pub fn memory_updated(module_id: impl Into<String>, memory_id: Uuid) -> Self {
        ChangeEvent::MemoryUpdated {
            module_id: module_id.into(),
            memory_id,
            timestamp: Utc::now(),
        }
    }

    pub fn memory_deleted(module_id: impl Into<String>, memory_id: Uuid) -> Self {
        ChangeEvent::MemoryDeleted {
            module_id: module_id.into(),
            memory_id,
            timestamp: Utc::now(),
        }
    }

    pub fn server_shutdown() -> Self {
        ChangeEvent::ServerShutdown { timestamp: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_created_serializes_with_type_tag() {
        let event = ChangeEvent::memory_created("technical", Uuid::nil());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "memory_created");
        assert_eq!(json["module_id"], "technical");
    }

    #[test]
    fn server_shutdown_round_trips() {
        let event = ChangeEvent::server_shutdown();
        let json = serde_json::to_string(&event).unwrap();
        let back: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ChangeEvent::ServerShutdown { .. }));
    }
}
