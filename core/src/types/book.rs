use serde::{Deserialize, Serialize};

use crate::constants::{B2_NUM_STATUSES, B3_NUM_STATUSES};
use crate::savefile::SavefileError;

/// One of the three game releases, each with its own record layout.
///
/// The tag is resolved once, at construction, and every layout decision
/// downstream is keyed off it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Book {
    Book1 = 1,
    Book2 = 2,
    Book3 = 3,
}

impl Book {
    /// Maps a raw book number to the version tag. This is the only place
    /// raw book numbers are interpreted.
    pub fn from_number(book: u8) -> Result<Self, SavefileError> {
        match book {
            1 => Ok(Book::Book1),
            2 => Ok(Book::Book2),
            3 => Ok(Book::Book3),
            other => Err(SavefileError::UnsupportedBook(other)),
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Length of the savegame status array for entity records.
    pub fn num_statuses(self) -> usize {
        match self {
            Book::Book1 => 0,
            Book::Book2 => B2_NUM_STATUSES,
            Book::Book3 => B3_NUM_STATUSES,
        }
    }
}
