use std::collections::HashSet;

use looks_core::{
    FieldDefinition, LookId, LookNode, LookRevision, NewLook, RevisionId, TreeRow, TreeUpdate,
    UserId,
};

use crate::error::StorageError;
use crate::settings::LookSettings;

/// Result of a case-insensitive name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch {
    pub id: LookId,
    pub published: bool,
}

pub trait LookStorage {
    /// Insert a look and its first revision.
    fn create_look(
        &mut self,
        look: &NewLook,
        log_message: Option<&str>,
    ) -> Result<LookNode, StorageError>;

    /// Overwrite a look's current values and record a new revision.
    fn update_look(
        &mut self,
        look: &LookNode,
        log_message: Option<&str>,
    ) -> Result<RevisionId, StorageError>;

    fn load_look(&self, id: LookId) -> Result<Option<LookNode>, StorageError>;

    /// Exact name match, ignoring case.
    fn find_by_name(&self, name: &str) -> Result<Option<NameMatch>, StorageError>;

    /// Direct children of `parent` ordered by `(weight, name)`.
    fn load_children(&self, parent: LookId) -> Result<Vec<LookNode>, StorageError>;

    /// Every look ordered by `(weight, name)`.
    fn tree_rows(&self) -> Result<Vec<TreeRow>, StorageError>;

    /// Every look ordered by name.
    fn names(&self) -> Result<Vec<(LookId, String)>, StorageError>;

    /// Looks with a non-empty value in `field_name`, in storage order.
    fn text_field_rules(&self, field_name: &str) -> Result<Vec<(LookId, String)>, StorageError>;

    /// Apply parent/weight changes in one transaction. Rows whose stored
    /// parent and weight already match are not written. Returns the ids
    /// that were written.
    fn reparent_and_reweight(&mut self, updates: &[TreeUpdate]) -> Result<Vec<LookId>, StorageError>;

    /// Delete a look and hand its direct children to its parent, atomically.
    /// Returns the ids of the reassigned children.
    fn delete_look(&mut self, id: LookId) -> Result<Vec<LookId>, StorageError>;

    fn revision_ids(&self, id: LookId) -> Result<Vec<RevisionId>, StorageError>;

    fn author_revision_ids(&self, author: UserId) -> Result<Vec<RevisionId>, StorageError>;

    fn load_revision(&self, revision_id: RevisionId) -> Result<Option<LookRevision>, StorageError>;

    /// Remove a past revision. The current revision of a look cannot be
    /// deleted.
    fn delete_revision(&mut self, revision_id: RevisionId) -> Result<(), StorageError>;

    fn field_definitions(&self) -> Result<Vec<FieldDefinition>, StorageError>;

    fn save_field_definition(&mut self, definition: &FieldDefinition) -> Result<(), StorageError>;

    fn load_settings(&self) -> Result<LookSettings, StorageError>;

    fn save_settings(&mut self, settings: &LookSettings) -> Result<(), StorageError>;

    /// The look followed by its ancestors, root last.
    ///
    /// The walk ends quietly at a missing parent, and at a look already
    /// visited so a corrupted parent cycle still terminates.
    fn load_ancestors(&self, id: LookId) -> Result<Vec<LookNode>, StorageError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(id);
        while let Some(current) = next {
            if !seen.insert(current) {
                break;
            }
            let Some(look) = self.load_look(current)? else {
                break;
            };
            next = look.parent;
            chain.push(look);
        }
        Ok(chain)
    }
}
