//! Tile records: one per map grid cell.

use crate::gamedata::GameData;
use crate::savefile::{Savefile, SavefileError};
use crate::types::{Book, Entity};

/// Capability contract for the opaque records a tile can own (scripted
/// objects, containers, triggers). Their wire format belongs to the owning
/// map layer; the tile only needs deep copies (`Clone`), structural
/// equality (`PartialEq`) and the variant-conversion hook below.
pub trait TileContent: Clone + PartialEq {
    fn convert_savegame(&mut self, savegame: bool);
}

/// Book-specific tail of a tile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileBookData {
    /// Byte of unknown meaning; probably the high half of the wall image.
    /// Round-tripped verbatim.
    Book1 { unknown5: u8 },
    Book2 {
        /// Savegame-only; zero in base-map form.
        tile_flag: u32,
    },
    Book3 {
        /// Savegame-only; zero in base-map form.
        tile_flag: u32,
        /// Savegame-only map-reveal state; zero in base-map form.
        cartography: u32,
    },
}

impl TileBookData {
    fn blank(book: Book) -> Self {
        match book {
            Book::Book1 => TileBookData::Book1 { unknown5: 0 },
            Book::Book2 => TileBookData::Book2 { tile_flag: 0 },
            Book::Book3 => TileBookData::Book3 {
                tile_flag: 0,
                cartography: 0,
            },
        }
    }
}

/// A single map grid cell, plus whatever it exclusively owns: at most one
/// entity and an ordered list of content records.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile<C: TileContent> {
    book: Book,
    savegame: bool,
    pub x: u8,
    pub y: u8,
    pub wall: u8,
    pub floor_img: u8,
    pub decal_img: u8,
    /// One byte on disk in book 1, two bytes in books 2 and 3.
    pub wall_img: u16,
    pub wall_decal_img: u8,
    pub content_id: u8,
    pub book_data: TileBookData,
    pub tilecontents: Vec<C>,
    pub entity: Option<Entity>,
}

impl<C: TileContent> Tile<C> {
    /// A fresh blank tile in base-map form.
    pub fn new(book: Book, x: u8, y: u8) -> Self {
        Tile {
            book,
            savegame: false,
            x,
            y,
            wall: 0,
            floor_img: 0,
            decal_img: 0,
            wall_img: 0,
            wall_decal_img: 0,
            content_id: 0,
            book_data: TileBookData::blank(book),
            tilecontents: Vec::new(),
            entity: None,
        }
    }

    pub fn book(&self) -> Book {
        self.book
    }

    pub fn is_savegame(&self) -> bool {
        self.savegame
    }

    /// Reads one tile record. There is no sentinel: the owning map reads
    /// exactly width*height of these, and coordinates are positional, not
    /// part of the record.
    pub fn read(
        df: &mut Savefile,
        book: Book,
        savegame: bool,
        x: u8,
        y: u8,
    ) -> Result<Self, SavefileError> {
        let mut tile = Tile::new(book, x, y);
        tile.savegame = savegame;

        tile.wall = df.read_uchar()?;
        tile.floor_img = df.read_uchar()?;
        tile.decal_img = df.read_uchar()?;
        match &mut tile.book_data {
            TileBookData::Book1 { unknown5 } => {
                tile.wall_img = u16::from(df.read_uchar()?);
                *unknown5 = df.read_uchar()?;
            }
            TileBookData::Book2 { .. } | TileBookData::Book3 { .. } => {
                tile.wall_img = df.read_short()?;
            }
        }
        tile.wall_decal_img = df.read_uchar()?;
        tile.content_id = df.read_uchar()?;

        if savegame {
            match &mut tile.book_data {
                TileBookData::Book1 { .. } => {}
                TileBookData::Book2 { tile_flag } => {
                    *tile_flag = df.read_int()?;
                }
                TileBookData::Book3 {
                    tile_flag,
                    cartography,
                } => {
                    *tile_flag = df.read_int()?;
                    *cartography = df.read_int()?;
                }
            }
        }
        Ok(tile)
    }

    /// Writes this record field-for-field in layout order.
    pub fn write(&self, df: &mut Savefile) -> Result<(), SavefileError> {
        df.write_uchar(self.wall)?;
        df.write_uchar(self.floor_img)?;
        df.write_uchar(self.decal_img)?;
        match &self.book_data {
            TileBookData::Book1 { unknown5 } => {
                df.write_uchar(self.wall_img as u8)?;
                df.write_uchar(*unknown5)?;
            }
            TileBookData::Book2 { .. } | TileBookData::Book3 { .. } => {
                df.write_short(self.wall_img)?;
            }
        }
        df.write_uchar(self.wall_decal_img)?;
        df.write_uchar(self.content_id)?;

        if self.savegame {
            match &self.book_data {
                TileBookData::Book1 { .. } => {}
                TileBookData::Book2 { tile_flag } => {
                    df.write_int(*tile_flag)?;
                }
                TileBookData::Book3 {
                    tile_flag,
                    cartography,
                } => {
                    df.write_int(*tile_flag)?;
                    df.write_int(*cartography)?;
                }
            }
        }
        Ok(())
    }

    /// Resets to a blank tile at the given coordinates, discarding any
    /// owned entity and contents.
    pub fn tozero(&mut self, x: u8, y: u8) {
        self.x = x;
        self.y = y;
        self.wall = 0;
        self.floor_img = 0;
        self.decal_img = 0;
        self.wall_img = 0;
        self.wall_decal_img = 0;
        self.content_id = 0;
        self.book_data = TileBookData::blank(self.book);
        self.tilecontents.clear();
        self.entity = None;
    }

    /// Whether anything here is non-zero. Sparse map regions skip
    /// persisting tiles that hold no data.
    pub fn has_data(&self) -> bool {
        let book_specific = match &self.book_data {
            TileBookData::Book1 { unknown5 } => *unknown5 != 0,
            TileBookData::Book2 { tile_flag } => *tile_flag != 0,
            TileBookData::Book3 {
                tile_flag,
                cartography,
            } => *tile_flag != 0 || *cartography != 0,
        };
        book_specific
            || self.wall != 0
            || self.floor_img != 0
            || self.decal_img != 0
            || self.wall_img != 0
            || self.wall_decal_img != 0
            || self.content_id != 0
    }

    /// Toggles between savegame and base-map form, recursing into every
    /// owned content record and the owned entity. The savegame-only
    /// numeric fields never survive: they are reset in both directions.
    pub fn convert_savegame(&mut self, savegame: bool, gamedata: &dyn GameData) {
        for content in &mut self.tilecontents {
            content.convert_savegame(savegame);
        }
        if let Some(entity) = self.entity.as_mut() {
            entity.convert_savegame(savegame, gamedata);
        }
        self.savegame = savegame;
        match &mut self.book_data {
            TileBookData::Book1 { .. } => {}
            TileBookData::Book2 { tile_flag } => {
                *tile_flag = 0;
            }
            TileBookData::Book3 {
                tile_flag,
                cartography,
            } => {
                *tile_flag = 0;
                *cartography = 0;
            }
        }
    }

    /// An independent copy of the whole owned graph.
    pub fn replicate(&self) -> Self {
        self.clone()
    }

    /// Appends a content record. In-memory composition only; the map layer
    /// decides when any of this is persisted.
    pub fn add_tilecontent(&mut self, content: C) {
        self.tilecontents.push(content);
    }

    /// Removes the first content record equal to the given one.
    pub fn del_tilecontent(&mut self, content: &C) -> Option<C> {
        let index = self.tilecontents.iter().position(|c| c == content)?;
        Some(self.tilecontents.remove(index))
    }

    /// Attaches an entity, replacing (and thereby destroying) any current
    /// one.
    pub fn add_entity(&mut self, entity: Entity) {
        self.entity = Some(entity);
    }

    /// Drops the owned entity. Fine to call when there is none.
    pub fn del_entity(&mut self) {
        self.entity = None;
    }

    /// Multi-line description of the tile and its owned entity.
    pub fn display(&self, gamedata: &dyn GameData) -> String {
        let mut out = Vec::new();
        out.push(format!("    Wall Flag: {}", self.wall));
        out.push(format!("    Floor Image: {}", self.floor_img));
        out.push(format!("    Decal Image: {}", self.decal_img));
        out.push(format!("    Wall Image: {}", self.wall_img));
        out.push(format!("    Wall Decal Image: {}", self.wall_decal_img));
        match gamedata.content_type_name(self.content_id) {
            Some(name) => out.push(format!("    Object Type: {name}")),
            None => out.push(format!("    Object Type: {}", self.content_id)),
        }
        match &self.book_data {
            TileBookData::Book1 { unknown5 } => {
                out.push(format!("    Unknown 5: {unknown5}"));
            }
            TileBookData::Book2 { tile_flag } => {
                out.push(format!("    Tile flag: {tile_flag}"));
            }
            TileBookData::Book3 {
                tile_flag,
                cartography,
            } => {
                out.push(format!("    Tile flag: {tile_flag}"));
                out.push(format!("    Cartography: {cartography}"));
            }
        }
        if let Some(entity) = &self.entity {
            out.push(String::new());
            out.push("  Associated Entity:".to_string());
            out.push(entity.display(gamedata));
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::NoGameData;

    /// Stand-in for the external content records the map layer owns.
    #[derive(Debug, Clone, PartialEq)]
    struct Chest {
        loot: u32,
        savegame: bool,
    }

    impl TileContent for Chest {
        fn convert_savegame(&mut self, savegame: bool) {
            self.savegame = savegame;
        }
    }

    fn write_bytes(write: impl FnOnce(&mut Savefile)) -> Vec<u8> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tiles.dat");
        let mut df = Savefile::new(&path);
        df.open_w().expect("open for writing");
        write(&mut df);
        df.close().expect("close");
        std::fs::read(&path).expect("read back")
    }

    fn open_buffer(data: Vec<u8>) -> Savefile {
        let mut df = Savefile::from_buffer(data);
        df.open_r().expect("open for reading");
        df
    }

    #[test]
    fn book1_record_is_seven_bytes_with_unknown5_after_wall_img() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book1, 0, 0);
        tile.wall = 1;
        tile.floor_img = 2;
        tile.decal_img = 3;
        tile.wall_img = 4;
        tile.wall_decal_img = 6;
        tile.content_id = 7;
        tile.book_data = TileBookData::Book1 { unknown5: 5 };

        let bytes = write_bytes(|df| tile.write(df).unwrap());
        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6, 7]);

        let mut df = open_buffer(bytes);
        let decoded: Tile<Chest> = Tile::read(&mut df, Book::Book1, false, 0, 0).unwrap();
        assert_eq!(decoded, tile);
        assert!(df.eof().unwrap());
    }

    #[test]
    fn book2_wall_img_is_two_bytes_wide() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book2, 0, 0);
        tile.wall_img = 0x0201;

        let bytes = write_bytes(|df| tile.write(df).unwrap());
        assert_eq!(bytes, vec![0, 0, 0, 0x01, 0x02, 0, 0]);
    }

    #[test]
    fn savegame_round_trip_per_book() {
        for book in [Book::Book1, Book::Book2, Book::Book3] {
            let mut tile: Tile<Chest> = Tile::new(book, 9, 9);
            tile.savegame = true;
            tile.wall = 1;
            tile.floor_img = 120;
            tile.wall_img = 40;
            tile.content_id = 2;
            match &mut tile.book_data {
                TileBookData::Book1 { unknown5 } => *unknown5 = 8,
                TileBookData::Book2 { tile_flag } => *tile_flag = 9,
                TileBookData::Book3 {
                    tile_flag,
                    cartography,
                } => {
                    *tile_flag = 9;
                    *cartography = 4;
                }
            }

            let bytes = write_bytes(|df| tile.write(df).unwrap());
            let mut df = open_buffer(bytes);
            let decoded: Tile<Chest> = Tile::read(&mut df, book, true, 9, 9).unwrap();
            assert_eq!(decoded, tile);
            assert!(df.eof().unwrap());
        }
    }

    #[test]
    fn base_map_form_omits_savegame_fields_on_disk() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book3, 0, 0);
        tile.wall = 1;
        let bytes = write_bytes(|df| tile.write(df).unwrap());
        // wall, floor, decal, wall_img (2 bytes), wall decal, content id.
        assert_eq!(bytes.len(), 7);
    }

    #[test]
    fn conversion_to_base_map_clears_savegame_fields() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book3, 4, 4);
        tile.savegame = true;
        tile.wall = 3;
        tile.floor_img = 17;
        tile.book_data = TileBookData::Book3 {
            tile_flag: 9,
            cartography: 4,
        };

        tile.convert_savegame(false, &NoGameData);
        assert!(!tile.is_savegame());
        assert_eq!(
            tile.book_data,
            TileBookData::Book3 {
                tile_flag: 0,
                cartography: 0
            }
        );
        assert_eq!(tile.wall, 3);
        assert_eq!(tile.floor_img, 17);
    }

    #[test]
    fn conversion_recurses_into_owned_entity_and_contents() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book2, 2, 3);
        tile.add_tilecontent(Chest {
            loot: 14,
            savegame: false,
        });
        let mut entity = Entity::new(Book::Book2, false);
        entity.tozero(2, 3);
        tile.add_entity(entity);

        tile.convert_savegame(true, &NoGameData);
        assert!(tile.is_savegame());
        assert!(tile.tilecontents[0].savegame);
        let entity = tile.entity.as_ref().unwrap();
        assert!(entity.is_savegame());
        assert_eq!(entity.save.as_ref().unwrap().statuses.len(), 26);

        // Flag words stay zero even after a round trip back to savegame.
        assert_eq!(tile.book_data, TileBookData::Book2 { tile_flag: 0 });
    }

    #[test]
    fn has_data_notices_any_nonzero_field() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book3, 0, 0);
        assert!(!tile.has_data());

        tile.wall_decal_img = 1;
        assert!(tile.has_data());

        tile.tozero(0, 0);
        assert!(!tile.has_data());
        tile.book_data = TileBookData::Book3 {
            tile_flag: 0,
            cartography: 1,
        };
        assert!(tile.has_data());

        let mut b1: Tile<Chest> = Tile::new(Book::Book1, 0, 0);
        b1.book_data = TileBookData::Book1 { unknown5: 2 };
        assert!(b1.has_data());
    }

    #[test]
    fn equality_covers_the_owned_graph() {
        let mut a: Tile<Chest> = Tile::new(Book::Book2, 1, 1);
        let mut b = a.clone();
        assert_eq!(a, b);

        b.add_tilecontent(Chest {
            loot: 1,
            savegame: false,
        });
        assert_ne!(a, b);

        a.add_tilecontent(Chest {
            loot: 1,
            savegame: false,
        });
        assert_eq!(a, b);

        let mut entity = Entity::new(Book::Book2, false);
        entity.tozero(1, 1);
        a.add_entity(entity);
        assert_ne!(a, b);

        b.add_entity(a.entity.clone().unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn replicate_deep_copies_entity_and_contents() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book3, 5, 5);
        tile.add_tilecontent(Chest {
            loot: 250,
            savegame: false,
        });
        let mut entity = Entity::new(Book::Book3, true);
        entity.tozero(5, 5);
        tile.add_entity(entity);

        let mut copy = tile.replicate();
        assert_eq!(copy, tile);

        copy.tilecontents[0].loot = 0;
        copy.entity.as_mut().unwrap().entid = 42;
        assert_eq!(tile.tilecontents[0].loot, 250);
        assert_eq!(tile.entity.as_ref().unwrap().entid, 1);
    }

    #[test]
    fn content_composition_helpers() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book1, 0, 0);
        let chest = Chest {
            loot: 3,
            savegame: false,
        };
        tile.add_tilecontent(chest.clone());
        assert_eq!(tile.tilecontents.len(), 1);

        assert_eq!(tile.del_tilecontent(&chest), Some(chest.clone()));
        assert!(tile.tilecontents.is_empty());
        assert_eq!(tile.del_tilecontent(&chest), None);

        tile.del_entity();
        assert!(tile.entity.is_none());
    }

    #[test]
    fn zeroing_discards_owned_records() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book2, 3, 3);
        tile.wall = 9;
        tile.add_tilecontent(Chest {
            loot: 1,
            savegame: false,
        });
        tile.add_entity(Entity::new(Book::Book2, false));

        tile.tozero(7, 8);
        assert_eq!((tile.x, tile.y), (7, 8));
        assert!(!tile.has_data());
        assert!(tile.tilecontents.is_empty());
        assert!(tile.entity.is_none());
    }

    #[test]
    fn display_includes_book_specific_fields() {
        let mut tile: Tile<Chest> = Tile::new(Book::Book3, 0, 0);
        tile.book_data = TileBookData::Book3 {
            tile_flag: 7,
            cartography: 1,
        };
        let text = tile.display(&NoGameData);
        assert!(text.contains("Tile flag: 7"));
        assert!(text.contains("Cartography: 1"));
    }
}
