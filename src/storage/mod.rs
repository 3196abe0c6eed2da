pub mod engine;
pub mod memory;
pub mod persistence;

pub use engine::RecordStore;
pub use memory::InMemoryRecordStore;
pub use persistence::{DEFAULT_CHECKPOINT_THRESHOLD, DurabilityMode};
