use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use looks_core::{
    CacheTag, FieldDefinition, FieldKind, FieldValue, LookId, LookNode, NewLook, PATH_FIELD,
    ResolvedLook, THEME_FIELD,
};
use looks_engine::{CacheError, EngineError, Looks, MemoryCache, ResolutionCache, RequestScope};
use looks_storage::SqliteStorage;

use crate::request::FakeRequest;

/// List field used to exercise list merging.
pub const REGIONS_FIELD: &str = "field_regions";

/// Reference field that may be mapped per theme.
pub const BANNER_FIELD: &str = "field_banner";

/// A look store with the usual fields registered.
pub struct TestSite {
    pub looks: Looks<SqliteStorage>,
    pub cache: Arc<MemoryCache>,
}

impl TestSite {
    pub fn new() -> Result<Self, EngineError> {
        let cache = Arc::new(MemoryCache::new());
        Self::with_cache(SqliteStorage::open_in_memory()?, cache)
    }

    pub fn open(path: &str, cache: Arc<MemoryCache>) -> Result<Self, EngineError> {
        Self::with_cache(SqliteStorage::open(path)?, cache)
    }

    fn with_cache(storage: SqliteStorage, cache: Arc<MemoryCache>) -> Result<Self, EngineError> {
        crate::logging::init();
        let shared: Arc<dyn ResolutionCache> = cache.clone();
        let mut site = Self {
            looks: Looks::with_cache(storage, shared),
            cache,
        };
        site.register_fields()?;
        Ok(site)
    }

    /// Reopening a file-backed site registers the same fields again.
    fn register_fields(&mut self) -> Result<(), EngineError> {
        for definition in [
            FieldDefinition::new(THEME_FIELD, "Theme", FieldKind::Text),
            FieldDefinition::new(PATH_FIELD, "Paths", FieldKind::Text),
            FieldDefinition::new(REGIONS_FIELD, "Regions", FieldKind::List),
            FieldDefinition::new(BANNER_FIELD, "Banner", FieldKind::EntityRef),
        ] {
            self.looks.register_field(definition)?;
        }
        Ok(())
    }

    /// Create a look, optionally under `parent`, with an optional theme.
    pub fn add(
        &mut self,
        name: &str,
        parent: Option<LookId>,
        theme: Option<&str>,
    ) -> Result<LookNode, EngineError> {
        let mut look = NewLook::named(name);
        if let Some(parent) = parent {
            look = look.with_parent(parent);
        }
        if let Some(theme) = theme {
            look = look.with_field(THEME_FIELD, FieldValue::Text(theme.to_string()));
        }
        self.looks.create_look(&look, None)
    }

    /// Set one field on a stored look and save it.
    pub fn set_field(&mut self, id: LookId, field: &str, value: FieldValue) -> Result<LookNode, EngineError> {
        let mut look = self
            .looks
            .load_look(id)?
            .ok_or(EngineError::LookNotFound(id))?;
        look.fields.insert(field.to_string(), value);
        self.looks.update_look(&look, None)?;
        self.looks
            .load_look(id)?
            .ok_or(EngineError::LookNotFound(id))
    }

    /// Resolve `request` in a fresh scope.
    pub fn resolve(&self, request: &FakeRequest) -> Result<Option<Arc<ResolvedLook>>, EngineError> {
        self.looks.resolve(&mut RequestScope::new(), request)
    }

    /// Id of the look `request` resolves to.
    pub fn resolved_id(&self, request: &FakeRequest) -> Result<Option<LookId>, EngineError> {
        Ok(self.resolve(request)?.map(|resolved| resolved.look_id))
    }
}

/// A cache whose backend is always down.
#[derive(Debug, Default)]
pub struct FailingCache {
    calls: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> CacheError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheError::Unavailable("connection refused".to_string())
    }
}

impl ResolutionCache for FailingCache {
    fn get(&self, _look_id: LookId) -> Result<Option<Arc<ResolvedLook>>, CacheError> {
        Err(self.fail())
    }

    fn put(
        &self,
        _look_id: LookId,
        _resolved: Arc<ResolvedLook>,
        _tags: BTreeSet<CacheTag>,
    ) -> Result<(), CacheError> {
        Err(self.fail())
    }

    fn invalidate(&self, _tag: &CacheTag) -> Result<usize, CacheError> {
        Err(self.fail())
    }
}
