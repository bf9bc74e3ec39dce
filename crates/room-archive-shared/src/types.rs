use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::ContentUri;

// Room identifier, e.g. `!abcdef:example.org`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Fully qualified user id, e.g. `@alice:example.org`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current state of a joined room member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Member {
    pub display_name: Option<String>,
    pub avatar: Option<ContentUri>,
}

/// Read-only snapshot of a joined room, as known to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub display_name: String,
    pub members: BTreeMap<UserId, Member>,
}

impl Room {
    pub fn new(id: RoomId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            members: BTreeMap::new(),
        }
    }

    /// Human readable sender label: `Nick <@user:server>` while the sender is
    /// still a member, `<@user:server>` otherwise.
    pub fn sender_name(&self, sender: &UserId) -> String {
        match self.members.get(sender) {
            Some(member) => {
                let nick = member.display_name.as_deref().unwrap_or(sender.as_str());
                format!("{nick} <{sender}>")
            }
            None => format!("<{sender}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_name_for_member() {
        let mut room = Room::new(RoomId::new("!r:example.org"), "General");
        room.members.insert(
            UserId::new("@alice:example.org"),
            Member {
                display_name: Some("Alice".into()),
                avatar: None,
            },
        );

        assert_eq!(
            room.sender_name(&UserId::new("@alice:example.org")),
            "Alice <@alice:example.org>"
        );
    }

    #[test]
    fn test_sender_name_member_without_nick() {
        let mut room = Room::new(RoomId::new("!r:example.org"), "General");
        room.members
            .insert(UserId::new("@bob:example.org"), Member::default());

        assert_eq!(
            room.sender_name(&UserId::new("@bob:example.org")),
            "@bob:example.org <@bob:example.org>"
        );
    }

    #[test]
    fn test_sender_name_after_leaving() {
        let room = Room::new(RoomId::new("!r:example.org"), "General");
        assert_eq!(
            room.sender_name(&UserId::new("@gone:example.org")),
            "<@gone:example.org>"
        );
    }
}
