pub mod error;
pub mod field_value;
pub mod ids;
pub mod look;
pub mod merge;
pub mod tags;

pub use error::CoreError;
pub use field_value::FieldValue;
pub use ids::*;
pub use look::*;
pub use merge::{ConfigMerger, DefaultModifiers, FieldModifiers, LookConfig, ResolvedLook};
pub use tags::CacheTag;
