//! Fixed per-book layout constants.

/// Number of status-effect slots in a book 2 savegame entity record.
pub const B2_NUM_STATUSES: usize = 26;

/// Number of status-effect slots in a book 3 savegame entity record.
pub const B3_NUM_STATUSES: usize = 30;

/// Terminator for on-disk text values. Not part of the value itself.
pub const STR_TERMINATOR: &[u8] = b"\r\n";
