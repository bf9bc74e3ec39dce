use serde::{Deserialize, Serialize};

use crate::types::{EventId, UserId};

/// One line of a room log. Written once, never revised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchivedRecord {
    pub event_id: EventId,
    pub sender_id: UserId,
    /// Sender label resolved at archive time (see `Room::sender_name`).
    pub sender_name: String,
    /// Origin server timestamp in milliseconds.
    pub timestamp: u64,
    #[serde(flatten)]
    pub kind: RecordKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordKind {
    Text {
        body: String,
    },
    Media {
        /// Location of the stored attachment, relative to the output root.
        src: String,
    },
    Redacted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_record_has_no_body() {
        let record = ArchivedRecord {
            event_id: EventId::new("$r"),
            sender_id: UserId::new("@a:example.org"),
            sender_name: "<@a:example.org>".into(),
            timestamp: 42,
            kind: RecordKind::Redacted,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "redacted");
        assert!(value.get("body").is_none());
        assert!(value.get("src").is_none());
    }

    #[test]
    fn test_media_record_shape() {
        let record = ArchivedRecord {
            event_id: EventId::new("$m"),
            sender_id: UserId::new("@a:example.org"),
            sender_name: "A <@a:example.org>".into(),
            timestamp: 7,
            kind: RecordKind::Media {
                src: "General_!r:example.org_media/cat.png".into(),
            },
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "media");
        assert_eq!(value["src"], "General_!r:example.org_media/cat.png");
        assert_eq!(value["timestamp"], 7);
    }
}
