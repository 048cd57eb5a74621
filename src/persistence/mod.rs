pub mod json_files;
pub mod repository;
pub mod sqlite;

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use json_files::JsonSlotStore;
pub use repository::SaveRepository;
pub use sqlite::SqliteSlotStore;

pub const SLOT_COUNT: u8 = 3;

/// A validated save slot number, `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SaveSlot(u8);

impl SaveSlot {
    pub fn new(number: u8) -> Result<Self, PersistenceError> {
        if (1..=SLOT_COUNT).contains(&number) {
            Ok(Self(number))
        } else {
            Err(PersistenceError::InvalidSlot(number))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = SaveSlot> {
        (1..=SLOT_COUNT).map(SaveSlot)
    }
}

impl fmt::Display for SaveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listing entry; filled without decoding the whole game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    pub slot: SaveSlot,
    pub save_time: String,
    pub game_time: u64,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("save slot {slot} is malformed: {source}")]
    Malformed {
        slot: SaveSlot,
        #[source]
        source: serde_json::Error,
    },
    #[error("save database schema {found} is not supported (expected {expected})")]
    Schema { found: i64, expected: i64 },
    #[error("invalid save slot {0}")]
    InvalidSlot(u8),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
