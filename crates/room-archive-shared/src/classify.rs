//! Event classifier: decides what, if anything, an event becomes in the
//! archive.

use crate::constants::{MEDIA_MSGTYPES, TEXT_MSGTYPES};
use crate::event::{MediaReference, RawEvent};

const ROOM_MESSAGE: &str = "m.room.message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventClass {
    Text {
        body: String,
    },
    Media {
        reference: MediaReference,
        /// Sender supplied file name, used to name the stored file.
        body: String,
    },
    Redacted,
    Ignored,
}

/// Classify a raw event. With `download_media` off every media event is
/// [`EventClass::Ignored`].
pub fn classify(event: &RawEvent, download_media: bool) -> EventClass {
    if event.is_redacted() {
        return EventClass::Redacted;
    }

    if event.kind != ROOM_MESSAGE {
        return EventClass::Ignored;
    }

    let Some(msgtype) = event.msgtype() else {
        return EventClass::Ignored;
    };

    if TEXT_MSGTYPES.contains(&msgtype) {
        return match event.body() {
            Some(body) => EventClass::Text {
                body: body.to_string(),
            },
            None => EventClass::Ignored,
        };
    }

    if MEDIA_MSGTYPES.contains(&msgtype) && download_media {
        if let Some(reference) = event.media_reference() {
            return EventClass::Media {
                reference,
                body: event.body().unwrap_or_default().to_string(),
            };
        }
    }

    EventClass::Ignored
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn event(kind: &str, content: Value) -> RawEvent {
        serde_json::from_value(json!({
            "event_id": "$e",
            "sender": "@a:example.org",
            "origin_server_ts": 1_600_000_000_000u64,
            "type": kind,
            "content": content,
        }))
        .unwrap()
    }

    #[test]
    fn test_text_message() {
        let ev = event("m.room.message", json!({ "msgtype": "m.text", "body": "hello" }));
        assert_eq!(
            classify(&ev, true),
            EventClass::Text {
                body: "hello".into()
            }
        );
    }

    #[test]
    fn test_notice_and_emote_are_text() {
        for msgtype in ["m.notice", "m.emote"] {
            let ev = event("m.room.message", json!({ "msgtype": msgtype, "body": "x" }));
            assert!(matches!(classify(&ev, false), EventClass::Text { .. }));
        }
    }

    #[test]
    fn test_media_message() {
        let ev = event(
            "m.room.message",
            json!({ "msgtype": "m.image", "body": "cat.png", "url": "mxc://example.org/cat" }),
        );

        match classify(&ev, true) {
            EventClass::Media { reference, body } => {
                assert_eq!(body, "cat.png");
                assert!(matches!(reference, MediaReference::Plaintext { .. }));
            }
            other => panic!("unexpected class: {other:?}"),
        }
    }

    #[test]
    fn test_media_disabled_is_ignored() {
        let ev = event(
            "m.room.message",
            json!({ "msgtype": "m.file", "body": "a.pdf", "url": "mxc://example.org/a" }),
        );
        assert_eq!(classify(&ev, false), EventClass::Ignored);
    }

    #[test]
    fn test_media_without_pointer_is_ignored() {
        let ev = event("m.room.message", json!({ "msgtype": "m.image", "body": "x.png" }));
        assert_eq!(classify(&ev, true), EventClass::Ignored);
    }

    #[test]
    fn test_redacted_wins() {
        let mut ev = event("m.room.message", json!({}));
        ev.unsigned = json!({ "redacted_because": { "type": "m.room.redaction" } });
        assert_eq!(classify(&ev, true), EventClass::Redacted);
    }

    #[test]
    fn test_other_events_ignored() {
        let reaction = event("m.reaction", json!({ "m.relates_to": {} }));
        let member = event("m.room.member", json!({ "membership": "join" }));
        let encrypted = event("m.room.encrypted", json!({ "algorithm": "m.megolm.v1.aes-sha2" }));
        let location = event("m.room.message", json!({ "msgtype": "m.location", "body": "here" }));

        for ev in [reaction, member, encrypted, location] {
            assert_eq!(classify(&ev, true), EventClass::Ignored);
        }
    }
}
