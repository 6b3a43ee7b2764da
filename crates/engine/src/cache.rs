use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use looks_core::{CacheTag, LookId, LookNode, ResolvedLook};
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Shared store of resolved looks keyed by look id.
///
/// Entries never expire. They are only removed by `invalidate`, which drops
/// every entry carrying the tag.
pub trait ResolutionCache: Send + Sync {
    fn get(&self, look_id: LookId) -> Result<Option<Arc<ResolvedLook>>, CacheError>;

    fn put(
        &self,
        look_id: LookId,
        resolved: Arc<ResolvedLook>,
        tags: BTreeSet<CacheTag>,
    ) -> Result<(), CacheError>;

    /// Returns the number of entries removed.
    fn invalidate(&self, tag: &CacheTag) -> Result<usize, CacheError>;
}

/// One tag per look in the chain the value was computed from.
pub fn chain_tags(chain: &[LookNode]) -> BTreeSet<CacheTag> {
    chain.iter().map(|look| CacheTag::look(look.id)).collect()
}

struct CacheEntry {
    value: Arc<ResolvedLook>,
    tags: BTreeSet<CacheTag>,
}

#[derive(Default)]
struct CacheIndex {
    entries: HashMap<LookId, CacheEntry>,
    by_tag: HashMap<CacheTag, HashSet<LookId>>,
}

impl CacheIndex {
    fn unlink(&mut self, look_id: LookId, tags: &BTreeSet<CacheTag>) {
        for tag in tags {
            if let Some(keys) = self.by_tag.get_mut(tag) {
                keys.remove(&look_id);
                if keys.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }
}

/// In-process cache with an inverted `tag -> keys` index.
#[derive(Default)]
pub struct MemoryCache {
    inner: RwLock<CacheIndex>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    pub fn contains(&self, look_id: LookId) -> bool {
        self.inner.read().entries.contains_key(&look_id)
    }
}

impl ResolutionCache for MemoryCache {
    fn get(&self, look_id: LookId) -> Result<Option<Arc<ResolvedLook>>, CacheError> {
        Ok(self
            .inner
            .read()
            .entries
            .get(&look_id)
            .map(|entry| Arc::clone(&entry.value)))
    }

    fn put(
        &self,
        look_id: LookId,
        resolved: Arc<ResolvedLook>,
        tags: BTreeSet<CacheTag>,
    ) -> Result<(), CacheError> {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.entries.remove(&look_id) {
            inner.unlink(look_id, &previous.tags);
        }
        for tag in &tags {
            inner.by_tag.entry(tag.clone()).or_default().insert(look_id);
        }
        inner.entries.insert(
            look_id,
            CacheEntry {
                value: resolved,
                tags,
            },
        );
        Ok(())
    }

    fn invalidate(&self, tag: &CacheTag) -> Result<usize, CacheError> {
        let mut inner = self.inner.write();
        let Some(keys) = inner.by_tag.remove(tag) else {
            return Ok(0);
        };
        let mut removed = 0;
        for look_id in keys {
            if let Some(entry) = inner.entries.remove(&look_id) {
                inner.unlink(look_id, &entry.tags);
                removed += 1;
            }
        }
        Ok(removed)
    }
}
