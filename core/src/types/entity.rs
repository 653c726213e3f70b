//! Entity records: one per map occupant or NPC spawn.

use crate::gamedata::GameData;
use crate::savefile::{Savefile, SavefileError};
use crate::types::Book;

/// Runtime fields present only in the savegame form of an entity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySaveData {
    pub friendly: u8,
    pub movement: u8,
    pub health: u32,
    pub frame: u8,
    /// Tile the entity spawned on, encoded as `y*100 + x`. Set by zeroing;
    /// stored as-is afterwards, so it can drift from (x, y) under direct
    /// coordinate edits.
    pub initial_loc: u32,
    /// Active status effects. Empty for book 1, 26 slots for book 2,
    /// 30 for book 3.
    pub statuses: Vec<u32>,
}

impl EntitySaveData {
    fn blank(book: Book) -> Self {
        EntitySaveData {
            friendly: 0,
            movement: 0,
            health: 0,
            frame: 0,
            initial_loc: 0,
            statuses: vec![0; book.num_statuses()],
        }
    }
}

/// Outcome of attempting to read one entity record.
///
/// Entity records are stored as a contiguous run with no count field, so
/// readers loop until the stream gives out. `EndOfList` is the clean case:
/// the stream was exhausted before the record began. `TruncatedTail` is
/// raised by books 2 and 3 when a record starts but the stream runs dry
/// mid-field; read loops treat it exactly like `EndOfList`, but it is kept
/// distinct for callers that want to notice corrupt trailing data. Book 1
/// surfaces mid-record truncation as a hard error instead.
#[derive(Debug)]
pub enum EntityRead {
    Record(Entity),
    EndOfList,
    TruncatedTail,
}

impl EntityRead {
    pub fn is_end(&self) -> bool {
        !matches!(self, EntityRead::Record(_))
    }

    pub fn into_record(self) -> Option<Entity> {
        match self {
            EntityRead::Record(entity) => Some(entity),
            _ => None,
        }
    }
}

/// A single map occupant.
///
/// The savegame-only payload lives in [`EntitySaveData`]; a base-map
/// entity carries `None` there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    book: Book,
    pub entid: u8,
    pub x: u8,
    pub y: u8,
    pub direction: u8,
    pub script: String,
    pub save: Option<EntitySaveData>,
}

impl Entity {
    /// A fresh blank entity of the given book and variant.
    pub fn new(book: Book, savegame: bool) -> Self {
        Entity {
            book,
            entid: 0,
            x: 0,
            y: 0,
            direction: 0,
            script: String::new(),
            save: savegame.then(|| EntitySaveData::blank(book)),
        }
    }

    pub fn book(&self) -> Book {
        self.book
    }

    pub fn is_savegame(&self) -> bool {
        self.save.is_some()
    }

    /// Reads the next entity record from the stream.
    ///
    /// Returns `EndOfList` when the stream is already exhausted. For books
    /// 2 and 3 a record cut off mid-field comes back as `TruncatedTail`;
    /// for book 1 it is an error.
    pub fn read(
        df: &mut Savefile,
        book: Book,
        savegame: bool,
    ) -> Result<EntityRead, SavefileError> {
        if df.eof()? {
            return Ok(EntityRead::EndOfList);
        }
        match Self::read_record(df, book, savegame) {
            Ok(entity) => Ok(EntityRead::Record(entity)),
            Err(err) if book != Book::Book1 && err.is_truncation() => {
                Ok(EntityRead::TruncatedTail)
            }
            Err(err) => Err(err),
        }
    }

    fn read_record(
        df: &mut Savefile,
        book: Book,
        savegame: bool,
    ) -> Result<Entity, SavefileError> {
        let mut entity = Entity::new(book, savegame);
        entity.entid = df.read_uchar()?;
        entity.x = df.read_uchar()?;
        entity.y = df.read_uchar()?;
        entity.direction = df.read_uchar()?;
        entity.script = df.read_str()?;
        if let Some(save) = entity.save.as_mut() {
            save.friendly = df.read_uchar()?;
            save.movement = df.read_uchar()?;
            save.health = df.read_int()?;
            save.frame = df.read_uchar()?;
            save.initial_loc = df.read_int()?;
            for status in save.statuses.iter_mut() {
                *status = df.read_int()?;
            }
        }
        Ok(entity)
    }

    /// Writes this record field-for-field in layout order. No length
    /// prefix, no separator beyond the script terminator.
    pub fn write(&self, df: &mut Savefile) -> Result<(), SavefileError> {
        df.write_uchar(self.entid)?;
        df.write_uchar(self.x)?;
        df.write_uchar(self.y)?;
        df.write_uchar(self.direction)?;
        df.write_str(&self.script)?;
        if let Some(save) = &self.save {
            df.write_uchar(save.friendly)?;
            df.write_uchar(save.movement)?;
            df.write_int(save.health)?;
            df.write_uchar(save.frame)?;
            df.write_int(save.initial_loc)?;
            for status in &save.statuses {
                df.write_int(*status)?;
            }
        }
        Ok(())
    }

    /// Resets to a blank record at the given coordinates.
    pub fn tozero(&mut self, x: u8, y: u8) {
        self.x = x;
        self.y = y;
        self.entid = 1;
        self.direction = 1;
        self.script.clear();
        let book = self.book;
        if let Some(save) = self.save.as_mut() {
            save.movement = 1;
            save.friendly = 0;
            save.frame = 0;
            save.health = 0;
            save.initial_loc = 0;
            save.statuses = vec![0; book.num_statuses()];
        }
        self.set_initial(x, y);
    }

    /// Derives `initial_loc` from actual coordinates.
    pub fn set_initial(&mut self, x: u8, y: u8) {
        if let Some(save) = self.save.as_mut() {
            save.initial_loc = u32::from(y) * 100 + u32::from(x);
        }
    }

    /// An independent copy sharing no state with this entity.
    pub fn replicate(&self) -> Entity {
        self.clone()
    }

    /// Toggles between the savegame and base-map variants in place.
    ///
    /// Identity fields (entid, direction, script) and coordinates are kept
    /// in both directions; everything savegame-only is re-zeroed and, when
    /// converting to a savegame, re-seeded from the entity definition
    /// lookup if it knows this entid.
    pub fn convert_savegame(&mut self, savegame: bool, gamedata: &dyn GameData) {
        let entid = self.entid;
        let direction = self.direction;
        let script = std::mem::take(&mut self.script);

        self.save = savegame.then(|| EntitySaveData::blank(self.book));
        self.tozero(self.x, self.y);
        self.entid = entid;
        self.direction = direction;
        self.script = script;

        if savegame {
            if let Some(definition) = gamedata.entity_definition(entid) {
                if let Some(save) = self.save.as_mut() {
                    save.friendly = definition.friendly;
                    save.health = definition.health;
                    save.movement = definition.movement;
                }
            } else {
                log::debug!("no entity definition for id {entid}, keeping zeroed stats");
            }
        }
    }

    /// Multi-line description of every field, resolving names through the
    /// given lookup where possible.
    pub fn display(&self, gamedata: &dyn GameData) -> String {
        let mut out = Vec::new();

        match gamedata.entity_definition(self.entid) {
            Some(definition) => out.push(format!("\tEntity: {}", definition.name)),
            None => out.push(format!("\tEntity ID: {}", self.entid)),
        }
        out.push(format!("\tMap Location: ({}, {})", self.x, self.y));
        match gamedata.direction_name(self.direction) {
            Some(name) => out.push(format!("\tFacing {name}")),
            None => out.push(format!("\tDirection ID: {}", self.direction)),
        }
        out.push(format!("\tScript: {}", self.script));

        match &self.save {
            Some(save) => {
                out.push(format!("\tFriendly: {}", save.friendly));
                out.push(format!("\tHealth: {}", save.health));
                out.push(format!("\tInitial Tile: {}", save.initial_loc));
                out.push(format!("\tMovement Flag: {}", save.movement));
                for (i, status) in save.statuses.iter().enumerate() {
                    if *status != 0 {
                        match gamedata.status_name(i) {
                            Some(name) => out.push(format!("\t{name}: {status}")),
                            None => out.push(format!("\tUnknown Status \"{i}\": {status}")),
                        }
                    }
                }
            }
            None => out.push(
                "\t(No extra attributes - this is the base map definition file)".to_string(),
            ),
        }

        out.join("\n")
    }
}
