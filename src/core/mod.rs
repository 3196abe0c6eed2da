pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, StoreError};
pub use types::{Record, RecordDraft, RecordId};
pub use value::Value;
