//! Room model built from a full-state `/sync` response.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use room_archive_shared::{Member, Room, RoomId, UserId};

const HERO_COUNT: usize = 3;

#[derive(Debug, Deserialize)]
pub(crate) struct SyncResponse {
    #[serde(default)]
    rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
struct SyncRooms {
    #[serde(default)]
    join: BTreeMap<String, JoinedRoom>,
}

#[derive(Debug, Default, Deserialize)]
struct JoinedRoom {
    #[serde(default)]
    state: EventList,
    #[serde(default)]
    timeline: Timeline,
}

#[derive(Debug, Default, Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<StateEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct Timeline {
    #[serde(default)]
    events: Vec<StateEvent>,
    prev_batch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StateEvent {
    #[serde(rename = "type")]
    kind: String,
    state_key: Option<String>,
    #[serde(default)]
    content: Value,
}

/// A joined room together with the token its timeline starts at.
#[derive(Debug, Clone)]
pub(crate) struct SyncedRoom {
    pub room: Room,
    pub prev_batch: Option<String>,
}

pub(crate) fn rooms_from_sync(response: SyncResponse, own_user: &UserId) -> Vec<SyncedRoom> {
    response
        .rooms
        .join
        .into_iter()
        .map(|(id, joined)| build_room(RoomId::new(id), joined, own_user))
        .collect()
}

fn build_room(id: RoomId, joined: JoinedRoom, own_user: &UserId) -> SyncedRoom {
    let mut name = None;
    let mut alias = None;
    let mut members = BTreeMap::new();

    // timeline state events are newer than the state block
    let state = joined
        .state
        .events
        .iter()
        .chain(joined.timeline.events.iter())
        .filter(|e| e.state_key.is_some());

    for event in state {
        match event.kind.as_str() {
            "m.room.name" => name = non_empty(event.content.get("name")),
            "m.room.canonical_alias" => alias = non_empty(event.content.get("alias")),
            "m.room.member" => {
                let Some(user) = event.state_key.as_deref() else {
                    continue;
                };
                let membership = event.content.get("membership").and_then(Value::as_str);
                if membership == Some("join") {
                    let member = Member {
                        display_name: non_empty(event.content.get("displayname")),
                        avatar: event
                            .content
                            .get("avatar_url")
                            .and_then(Value::as_str)
                            .and_then(|s| s.parse().ok()),
                    };
                    members.insert(UserId::new(user), member);
                } else {
                    members.remove(&UserId::new(user));
                }
            }
            _ => {}
        }
    }

    let display_name = name
        .or(alias)
        .or_else(|| hero_name(&members, own_user))
        .unwrap_or_else(|| id.to_string());

    SyncedRoom {
        room: Room {
            id,
            display_name,
            members,
        },
        prev_batch: joined.timeline.prev_batch,
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn hero_name(members: &BTreeMap<UserId, Member>, own_user: &UserId) -> Option<String> {
    let mut heroes: Vec<&str> = members
        .iter()
        .filter(|(user, _)| *user != own_user)
        .map(|(user, member)| member.display_name.as_deref().unwrap_or(user.as_str()))
        .collect();
    if heroes.is_empty() {
        return None;
    }
    heroes.sort_unstable();
    heroes.truncate(HERO_COUNT);
    Some(heroes.join(", "))
}
