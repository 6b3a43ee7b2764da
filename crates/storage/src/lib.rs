pub mod error;
pub mod schema;
pub mod settings;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use settings::{FieldMapping, LookSettings, DEFAULT_MAPPING_WEIGHT};
pub use sqlite::SqliteStorage;
pub use traits::*;
