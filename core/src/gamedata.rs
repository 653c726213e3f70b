//! Read-only game data lookups injected into the record types.
//!
//! The tables themselves (shipped entity definitions, display names) belong
//! to the embedding application; the codec only consumes them through this
//! trait, so there is no global table anywhere in the crate.

use serde::{Deserialize, Serialize};

/// Static definition of an entity type, as shipped with a game release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub friendly: u8,
    pub health: u32,
    pub movement: u8,
}

/// Lookup capability for game data tables.
///
/// Only `entity_definition` affects record contents (savegame conversion
/// re-seeds runtime stats from it); the remaining hooks feed display
/// formatting and default to a miss.
pub trait GameData {
    fn entity_definition(&self, entid: u8) -> Option<&EntityDefinition>;

    fn direction_name(&self, direction: u8) -> Option<&str> {
        let _ = direction;
        None
    }

    fn status_name(&self, index: usize) -> Option<&str> {
        let _ = index;
        None
    }

    fn content_type_name(&self, content_id: u8) -> Option<&str> {
        let _ = content_id;
        None
    }
}

/// Lookup with nothing behind it; every query misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGameData;

impl GameData for NoGameData {
    fn entity_definition(&self, _entid: u8) -> Option<&EntityDefinition> {
        None
    }
}
