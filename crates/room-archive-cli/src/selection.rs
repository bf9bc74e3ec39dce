//! Which joined rooms a run archives.

use regex::Regex;
use tracing::warn;

use room_archive_shared::{Room, RoomId};

use crate::error::ConfigError;

/// Explicit room ids, id patterns and the "everything" switch. A room is
/// selected when any of them matches.
#[derive(Debug, Clone, Default)]
pub struct RoomSelection {
    ids: Vec<RoomId>,
    patterns: Vec<Regex>,
    all: bool,
}

impl RoomSelection {
    /// Patterns only need to match at the start of the room id.
    pub fn new(ids: Vec<String>, patterns: &[String], all: bool) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})")).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ids: ids.into_iter().map(RoomId::new).collect(),
            patterns,
            all,
        })
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.ids.is_empty() && self.patterns.is_empty()
    }

    pub fn matches(&self, room: &RoomId) -> bool {
        self.all || self.ids.contains(room) || self.patterns.iter().any(|p| p.is_match(room.as_str()))
    }

    /// Selected rooms in session order. Requested ids the account has not
    /// joined are reported and skipped.
    pub fn select(&self, rooms: &[Room]) -> Vec<Room> {
        for id in &self.ids {
            if !rooms.iter().any(|room| &room.id == id) {
                warn!(room = %id, "Requested room is not joined, skipping");
            }
        }

        rooms.iter().filter(|room| self.matches(&room.id)).cloned().collect()
    }
}
