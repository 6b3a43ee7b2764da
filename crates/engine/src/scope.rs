use std::collections::HashMap;
use std::sync::Arc;

use looks_core::{LookId, LookNode, ResolvedLook};
use looks_storage::{LookStorage, StorageError};

/// Per-request memo. Create one per request and drop it afterwards; nothing
/// here is ever invalidated.
#[derive(Debug, Default)]
pub struct RequestScope {
    ancestors: HashMap<LookId, Vec<LookNode>>,
    children: HashMap<LookId, Vec<LookNode>>,
    resolved: HashMap<LookId, Arc<ResolvedLook>>,
    active: Option<Option<Arc<ResolvedLook>>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized `load_ancestors`.
    pub fn ancestors<S>(&mut self, storage: &S, id: LookId) -> Result<&[LookNode], StorageError>
    where
        S: LookStorage + ?Sized,
    {
        if !self.ancestors.contains_key(&id) {
            let chain = storage.load_ancestors(id)?;
            self.ancestors.insert(id, chain);
        }
        Ok(self.ancestors.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    /// Memoized `load_children`.
    pub fn children<S>(&mut self, storage: &S, id: LookId) -> Result<&[LookNode], StorageError>
    where
        S: LookStorage + ?Sized,
    {
        if !self.children.contains_key(&id) {
            let children = storage.load_children(id)?;
            self.children.insert(id, children);
        }
        Ok(self.children.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    pub(crate) fn resolved(&self, id: LookId) -> Option<Arc<ResolvedLook>> {
        self.resolved.get(&id).cloned()
    }

    pub(crate) fn remember(&mut self, id: LookId, resolved: Arc<ResolvedLook>) {
        self.resolved.insert(id, resolved);
    }

    /// `None` until the active look has been resolved for this request.
    pub fn active(&self) -> Option<Option<&Arc<ResolvedLook>>> {
        self.active.as_ref().map(Option::as_ref)
    }

    pub(crate) fn set_active(&mut self, active: Option<Arc<ResolvedLook>>) {
        self.active = Some(active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use looks_core::NewLook;
    use looks_storage::SqliteStorage;

    #[test]
    fn ancestors_are_loaded_once() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let root = storage.create_look(&NewLook::named("root"), None).unwrap();
        let child = storage
            .create_look(&NewLook::named("child").with_parent(root.id), None)
            .unwrap();

        let mut scope = RequestScope::new();
        assert_eq!(scope.ancestors(&storage, child.id).unwrap().len(), 2);

        // a later write is not seen through the same scope
        storage.delete_look(root.id).unwrap();
        assert_eq!(scope.ancestors(&storage, child.id).unwrap().len(), 2);
        assert_eq!(RequestScope::new().ancestors(&storage, child.id).unwrap().len(), 1);
    }

    #[test]
    fn children_are_loaded_once() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let root = storage.create_look(&NewLook::named("root"), None).unwrap();
        let mut scope = RequestScope::new();
        assert!(scope.children(&storage, root.id).unwrap().is_empty());

        storage
            .create_look(&NewLook::named("late").with_parent(root.id), None)
            .unwrap();
        assert!(scope.children(&storage, root.id).unwrap().is_empty());
        assert_eq!(RequestScope::new().children(&storage, root.id).unwrap().len(), 1);
    }

    #[test]
    fn active_starts_unresolved() {
        let mut scope = RequestScope::new();
        assert!(scope.active().is_none());
        scope.set_active(None);
        assert_eq!(scope.active(), Some(None));
    }
}
