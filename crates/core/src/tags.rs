use std::fmt;

use crate::ids::LookId;

/// Invalidation key attached to every cached value that was computed from
/// the tagged look.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn look(id: LookId) -> Self {
        Self(format!("look:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_tag_format() {
        assert_eq!(CacheTag::look(LookId::new(12)).as_str(), "look:12");
    }
}
