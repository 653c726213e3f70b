//! Record types for the three book generations.

mod book;
mod entity;
mod tile;

// Re-export all types
pub use book::Book;
pub use entity::{Entity, EntityRead, EntitySaveData};
pub use tile::{Tile, TileBookData, TileContent};
