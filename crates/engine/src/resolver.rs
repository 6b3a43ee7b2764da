use std::sync::Arc;

use looks_core::{ConfigMerger, DefaultModifiers, FieldModifiers, LookId, ResolvedLook};
use looks_storage::LookStorage;
use tracing::{debug, warn};

use crate::cache::{ResolutionCache, chain_tags};
use crate::context::RequestContext;
use crate::error::EngineError;
use crate::path::{PathMatcher, WildcardPathMatcher};
use crate::scope::RequestScope;
use crate::signals::{SignalExtractor, Signals, default_cascade};

/// The look a cascade step picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub look_id: LookId,
    pub extractor: &'static str,
}

/// Picks the active look for a request and computes its merged config.
pub struct LookResolver {
    extractors: Vec<Box<dyn SignalExtractor>>,
    cache: Arc<dyn ResolutionCache>,
    modifiers: Arc<dyn FieldModifiers>,
    path_matcher: Arc<dyn PathMatcher>,
}

impl LookResolver {
    pub fn new(cache: Arc<dyn ResolutionCache>) -> Self {
        Self {
            extractors: default_cascade(),
            cache,
            modifiers: Arc::new(DefaultModifiers),
            path_matcher: Arc::new(WildcardPathMatcher::new()),
        }
    }

    pub fn with_extractors(mut self, extractors: Vec<Box<dyn SignalExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Arc<dyn FieldModifiers>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_path_matcher(mut self, path_matcher: Arc<dyn PathMatcher>) -> Self {
        self.path_matcher = path_matcher;
        self
    }

    pub fn cache(&self) -> &Arc<dyn ResolutionCache> {
        &self.cache
    }

    /// Run the cascade. The first extractor that yields wins.
    pub fn select<S: LookStorage>(
        &self,
        storage: &S,
        request: &dyn RequestContext,
    ) -> Result<Option<Selection>, EngineError> {
        let signals = Signals {
            request,
            storage,
            path_matcher: self.path_matcher.as_ref(),
        };
        for extractor in &self.extractors {
            if let Some(look_id) = extractor.try_extract(&signals)? {
                debug!(extractor = extractor.name(), look_id = %look_id, "look selected");
                return Ok(Some(Selection {
                    look_id,
                    extractor: extractor.name(),
                }));
            }
        }
        debug!("no extractor selected a look");
        Ok(None)
    }

    /// Resolve the active look, once per scope.
    pub fn resolve<S: LookStorage>(
        &self,
        storage: &S,
        scope: &mut RequestScope,
        request: &dyn RequestContext,
    ) -> Result<Option<Arc<ResolvedLook>>, EngineError> {
        if let Some(active) = scope.active() {
            return Ok(active.cloned());
        }
        let resolved = match self.select(storage, request)? {
            Some(selection) => self.resolve_id(storage, scope, selection.look_id)?,
            None => None,
        };
        scope.set_active(resolved.clone());
        Ok(resolved)
    }

    /// Merged config of one look. `None` if the look does not exist.
    pub fn resolve_id<S: LookStorage>(
        &self,
        storage: &S,
        scope: &mut RequestScope,
        look_id: LookId,
    ) -> Result<Option<Arc<ResolvedLook>>, EngineError> {
        if let Some(hit) = scope.resolved(look_id) {
            return Ok(Some(hit));
        }
        match self.cache.get(look_id) {
            Ok(Some(hit)) => {
                scope.remember(look_id, Arc::clone(&hit));
                return Ok(Some(hit));
            }
            Ok(None) => debug!(look_id = %look_id, "resolution cache miss"),
            Err(e) => warn!(look_id = %look_id, error = %e, "resolution cache unavailable, recomputing"),
        }

        let chain = scope.ancestors(storage, look_id)?;
        let merger = ConfigMerger::new(self.modifiers.as_ref());
        let Some(resolved) = merger.resolve(chain) else {
            debug!(look_id = %look_id, "selected look does not exist");
            return Ok(None);
        };
        let tags = chain_tags(chain);
        let resolved = Arc::new(resolved);
        if let Err(e) = self.cache.put(look_id, Arc::clone(&resolved), tags) {
            warn!(look_id = %look_id, error = %e, "could not store resolved look");
        }
        scope.remember(look_id, Arc::clone(&resolved));
        Ok(Some(resolved))
    }
}
