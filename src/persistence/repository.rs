use crate::core::serialization::SaveRecord;
use crate::persistence::{PersistenceError, SaveSlot, SlotSummary};

/// Slot-addressed save storage. An empty slot is `Ok(None)`, not an error.
pub trait SaveRepository {
    /// Overwrite the slot with `record`.
    fn write_slot(&mut self, slot: SaveSlot, record: &SaveRecord) -> Result<(), PersistenceError>;
    fn read_slot(&self, slot: SaveSlot) -> Result<Option<SaveRecord>, PersistenceError>;
    /// Occupied slots in slot order.
    fn list_slots(&self) -> Result<Vec<SlotSummary>, PersistenceError>;
    /// Returns whether the slot held a record.
    fn delete_slot(&mut self, slot: SaveSlot) -> Result<bool, PersistenceError>;
}
