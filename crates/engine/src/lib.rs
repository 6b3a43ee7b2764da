pub mod access;
pub mod cache;
pub mod condition;
pub mod context;
pub mod editor;
pub mod error;
pub mod negotiation;
pub mod path;
pub mod resolver;
pub mod scope;
pub mod signals;
pub mod switcher;

pub use access::{Account, LookOperation, LookPermission, Permissions, check_access, check_create_access};
pub use cache::{CacheError, MemoryCache, ResolutionCache};
pub use condition::LookCondition;
pub use context::{RequestContext, RouteEntity};
pub use editor::{OutlineRow, ReorderError, ReorderPlan, ReorderRow, TreeEditor};
pub use error::EngineError;
pub use path::{PathMatcher, WildcardPathMatcher};
pub use resolver::{LookResolver, Selection};
pub use scope::RequestScope;
pub use signals::{ENTITY_LOOK_FIELD, LOOK_PARAMETER, SignalExtractor, Signals, default_cascade};
pub use switcher::{SwitcherEntry, switch_query};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use looks_core::{
    CacheTag, FieldDefinition, FieldKind, FieldValue, LookFields, LookId, LookNode, LookRevision, NewLook,
    ResolvedLook, RevisionId, UserId,
};
use looks_storage::{FieldMapping, LookSettings, LookStorage, SqliteStorage, StorageError};
use tracing::{debug, info, warn};

/// Look management and resolution over one store.
pub struct Looks<S: LookStorage = SqliteStorage> {
    storage: S,
    resolver: LookResolver,
}

impl<S: LookStorage> Looks<S> {
    /// A private in-memory cache and the default cascade.
    pub fn new(storage: S) -> Self {
        Self::with_cache(storage, Arc::new(MemoryCache::new()))
    }

    /// Share `cache` with other instances over the same data.
    pub fn with_cache(storage: S, cache: Arc<dyn ResolutionCache>) -> Self {
        Self::with_resolver(storage, LookResolver::new(cache))
    }

    pub fn with_resolver(storage: S, resolver: LookResolver) -> Self {
        Self { storage, resolver }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn resolver(&self) -> &LookResolver {
        &self.resolver
    }

    fn invalidate(&self, ids: impl IntoIterator<Item = LookId>) {
        for id in ids {
            let tag = CacheTag::look(id);
            match self.resolver.cache().invalidate(&tag) {
                Ok(removed) => debug!(tag = %tag, removed, "invalidated resolved looks"),
                Err(e) => warn!(tag = %tag, error = %e, "cache invalidation failed"),
            }
        }
    }

    fn require_look(&self, id: LookId) -> Result<LookNode, EngineError> {
        self.storage.load_look(id)?.ok_or(EngineError::LookNotFound(id))
    }

    fn validate_fields(&self, fields: &LookFields) -> Result<(), EngineError> {
        let kinds: HashMap<String, FieldKind> = self
            .storage
            .field_definitions()?
            .into_iter()
            .map(|definition| (definition.name, definition.kind))
            .collect();
        for (name, value) in fields {
            let kind = kinds
                .get(name)
                .ok_or_else(|| EngineError::UnknownField(name.clone()))?;
            if !kind.accepts(value) {
                return Err(EngineError::FieldKindMismatch {
                    field: name.clone(),
                    expected: *kind,
                });
            }
        }
        Ok(())
    }

    /// `parent` must exist and must not be `id` or one of its descendants.
    fn check_parent(&self, id: LookId, parent: Option<LookId>) -> Result<(), EngineError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        let chain = self.storage.load_ancestors(parent)?;
        if chain.is_empty() {
            return Err(EngineError::LookNotFound(parent));
        }
        if chain.iter().any(|look| look.id == id) {
            return Err(EngineError::CyclicParent { look: id, parent });
        }
        Ok(())
    }

    // Field schema

    pub fn register_field(&mut self, definition: FieldDefinition) -> Result<(), EngineError> {
        self.storage.save_field_definition(&definition)?;
        info!(field = %definition.name, kind = definition.kind.as_str(), "registered look field");
        Ok(())
    }

    pub fn field_definitions(&self) -> Result<Vec<FieldDefinition>, EngineError> {
        Ok(self.storage.field_definitions()?)
    }

    // Looks

    pub fn create_look(&mut self, look: &NewLook, log_message: Option<&str>) -> Result<LookNode, EngineError> {
        self.validate_fields(&look.fields)?;
        if let Some(parent) = look.parent {
            self.require_look(parent)?;
        }
        let created = self.storage.create_look(look, log_message)?;
        self.invalidate([created.id]);
        info!(look_id = %created.id, name = %created.name, "created look");
        Ok(created)
    }

    /// Save `look`'s current values as a new revision.
    pub fn update_look(&mut self, look: &LookNode, log_message: Option<&str>) -> Result<RevisionId, EngineError> {
        self.require_look(look.id)?;
        self.validate_fields(&look.fields)?;
        self.check_parent(look.id, look.parent)?;
        let revision_id = self.storage.update_look(look, log_message)?;
        self.invalidate([look.id]);
        info!(look_id = %look.id, revision_id = %revision_id, "updated look");
        Ok(revision_id)
    }

    /// Delete a look; its children move up to its parent. Returns the moved
    /// children.
    pub fn delete_look(&mut self, id: LookId) -> Result<Vec<LookId>, EngineError> {
        let reassigned = match self.storage.delete_look(id) {
            Ok(reassigned) => reassigned,
            Err(StorageError::NotFound(_)) => return Err(EngineError::LookNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        self.invalidate(std::iter::once(id).chain(reassigned.iter().copied()));
        info!(look_id = %id, reassigned = reassigned.len(), "deleted look");
        Ok(reassigned)
    }

    pub fn load_look(&self, id: LookId) -> Result<Option<LookNode>, EngineError> {
        Ok(self.storage.load_look(id)?)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<LookId>, EngineError> {
        Ok(self.storage.find_by_name(name)?.map(|found| found.id))
    }

    pub fn load_children(&self, parent: LookId) -> Result<Vec<LookNode>, EngineError> {
        Ok(self.storage.load_children(parent)?)
    }

    pub fn load_ancestors(&self, id: LookId) -> Result<Vec<LookNode>, EngineError> {
        Ok(self.storage.load_ancestors(id)?)
    }

    // Tree editing

    pub fn outline(&self) -> Result<Vec<OutlineRow>, EngineError> {
        Ok(TreeEditor::outline(&self.storage.tree_rows()?))
    }

    pub fn plan_reorder(&self, submitted: &[ReorderRow]) -> Result<ReorderPlan, EngineError> {
        Ok(TreeEditor::plan(&self.storage.tree_rows()?, submitted)?)
    }

    /// Apply a full pre-order submission. Either every changed row is
    /// written or none is. Returns the looks written.
    pub fn reorder(&mut self, submitted: &[ReorderRow]) -> Result<Vec<LookId>, EngineError> {
        let plan = self.plan_reorder(submitted)?;
        if plan.is_noop() {
            debug!(rows = submitted.len(), "reorder changed nothing");
            return Ok(Vec::new());
        }
        let written = self.storage.reparent_and_reweight(&plan.updates())?;
        self.invalidate(written.iter().copied());
        info!(rows = submitted.len(), written = written.len(), "reordered looks");
        Ok(written)
    }

    // Revisions

    pub fn revision_ids(&self, id: LookId) -> Result<Vec<RevisionId>, EngineError> {
        Ok(self.storage.revision_ids(id)?)
    }

    pub fn author_revision_ids(&self, author: UserId) -> Result<Vec<RevisionId>, EngineError> {
        Ok(self.storage.author_revision_ids(author)?)
    }

    pub fn load_revision(&self, revision_id: RevisionId) -> Result<Option<LookRevision>, EngineError> {
        Ok(self.storage.load_revision(revision_id)?)
    }

    /// Make an old revision current again by saving a copy of it.
    ///
    /// Fields no longer registered are dropped and fields the revision never
    /// set are cleared. A parent that no longer
    /// exists is replaced by the look's current parent.
    pub fn revert_to_revision(&mut self, revision_id: RevisionId) -> Result<RevisionId, EngineError> {
        let mut revision = self
            .storage
            .load_revision(revision_id)?
            .ok_or(EngineError::RevisionNotFound(revision_id))?;
        let mut look = self.require_look(revision.look_id)?;

        look.fields.clear();
        for definition in self.storage.field_definitions()? {
            let value = revision
                .fields
                .remove(&definition.name)
                .unwrap_or(FieldValue::Null);
            look.fields.insert(definition.name, value);
        }
        let parent_exists = match revision.parent {
            Some(parent) => self.storage.load_look(parent)?.is_some(),
            None => true,
        };
        if parent_exists {
            look.parent = revision.parent;
        }
        look.name = revision.name;
        look.weight = revision.weight;
        look.published = revision.published;

        let message = format!("Copy of revision {revision_id}");
        self.update_look(&look, Some(&message))
    }

    /// Delete a past revision. The current one is refused.
    pub fn delete_revision(&mut self, revision_id: RevisionId) -> Result<(), EngineError> {
        match self.storage.delete_revision(revision_id) {
            Ok(()) => {
                info!(revision_id = %revision_id, "deleted look revision");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => Err(EngineError::RevisionNotFound(revision_id)),
            Err(e) => Err(e.into()),
        }
    }

    // Settings

    pub fn settings(&self) -> Result<LookSettings, EngineError> {
        Ok(self.storage.load_settings()?)
    }

    /// Defaults must name existing looks. Mapped fields must be registered
    /// reference fields with a selector.
    pub fn save_settings(&mut self, settings: &LookSettings) -> Result<(), EngineError> {
        for id in [settings.default, settings.default_admin].into_iter().flatten() {
            self.require_look(id)?;
        }
        let kinds: HashMap<String, FieldKind> = self
            .storage
            .field_definitions()?
            .into_iter()
            .map(|definition| (definition.name, definition.kind))
            .collect();
        for (theme, fields) in &settings.mapping {
            for (field, mapping) in fields {
                let invalid = |reason: &str| EngineError::InvalidMapping {
                    theme: theme.clone(),
                    field: field.clone(),
                    reason: reason.to_string(),
                };
                match kinds.get(field) {
                    None => return Err(invalid("field is not registered")),
                    Some(kind) if !kind.is_reference() => {
                        return Err(invalid("only reference fields can be mapped"));
                    }
                    Some(_) => {}
                }
                if mapping.selector.trim().is_empty() {
                    return Err(invalid("selector is empty"));
                }
            }
        }
        self.storage.save_settings(settings)?;
        info!(
            default = ?settings.default,
            default_admin = ?settings.default_admin,
            themes = settings.mapping.len(),
            "saved look settings"
        );
        Ok(())
    }

    pub fn set_defaults(
        &mut self,
        default: Option<LookId>,
        default_admin: Option<LookId>,
    ) -> Result<(), EngineError> {
        let mut settings = self.settings()?;
        settings.default = default;
        settings.default_admin = default_admin;
        self.save_settings(&settings)
    }

    pub fn set_field_mapping(
        &mut self,
        theme: &str,
        field: &str,
        mapping: FieldMapping,
    ) -> Result<(), EngineError> {
        let mut settings = self.settings()?;
        settings
            .mapping
            .entry(theme.to_string())
            .or_default()
            .insert(field.to_string(), mapping);
        self.save_settings(&settings)
    }

    // Resolution

    /// The active look for this request, resolved once per scope.
    pub fn resolve(
        &self,
        scope: &mut RequestScope,
        request: &dyn RequestContext,
    ) -> Result<Option<Arc<ResolvedLook>>, EngineError> {
        self.resolver.resolve(&self.storage, scope, request)
    }

    /// Merged config of a specific look.
    pub fn resolve_look(
        &self,
        scope: &mut RequestScope,
        id: LookId,
    ) -> Result<Option<Arc<ResolvedLook>>, EngineError> {
        self.resolver.resolve_id(&self.storage, scope, id)
    }

    /// Like `resolve`, but a failure means no active look.
    pub fn active_look(
        &self,
        scope: &mut RequestScope,
        request: &dyn RequestContext,
    ) -> Option<Arc<ResolvedLook>> {
        match self.resolve(scope, request) {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "look resolution failed");
                scope.set_active(None);
                None
            }
        }
    }

    pub fn active_theme(&self, scope: &mut RequestScope, request: &dyn RequestContext) -> Option<String> {
        let active = self.active_look(scope, request);
        negotiation::active_theme(active.as_deref()).map(str::to_string)
    }

    pub fn cache_context(
        &self,
        scope: &mut RequestScope,
        request: &dyn RequestContext,
    ) -> Result<String, EngineError> {
        let active = self.active_look(scope, request);
        negotiation::cache_context(active.as_deref())
    }

    pub fn condition_passes(
        &self,
        condition: &LookCondition,
        scope: &mut RequestScope,
        request: &dyn RequestContext,
    ) -> bool {
        let active = self.active_look(scope, request);
        condition.evaluate(active.as_deref())
    }

    pub fn condition_summary(&self, condition: &LookCondition) -> Result<String, EngineError> {
        let names: HashMap<LookId, String> = self.storage.names()?.into_iter().collect();
        Ok(condition.summary(&names))
    }

    /// Switcher links for every look not in `exclude`, ordered by name.
    pub fn switcher(
        &self,
        exclude: &BTreeSet<LookId>,
        current_query: &[(String, String)],
    ) -> Result<Vec<SwitcherEntry>, EngineError> {
        Ok(switcher::switcher_entries(self.storage.names()?, exclude, current_query))
    }
}
