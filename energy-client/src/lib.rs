pub mod analytics;
pub mod db;
pub mod domain;
pub mod error;
pub mod store;
pub mod timestamp;

pub use error::{StoreError, ValidationError};
pub use store::{MemoryReadingStore, ReadingStore};
