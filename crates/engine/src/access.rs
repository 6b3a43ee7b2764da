use std::collections::HashSet;

use looks_core::LookNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookPermission {
    Administer,
    Add,
    Edit,
    Delete,
    ViewPublished,
    ViewUnpublished,
    RevertRevisions,
    DeleteRevisions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookOperation {
    View,
    Update,
    Delete,
    RevertRevision,
    DeleteRevision,
}

pub trait Account {
    fn has_permission(&self, permission: LookPermission) -> bool;
}

/// A fixed permission set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(HashSet<LookPermission>);

impl Permissions {
    pub fn new(permissions: impl IntoIterator<Item = LookPermission>) -> Self {
        Self(permissions.into_iter().collect())
    }

    pub fn administrator() -> Self {
        Self::new([LookPermission::Administer])
    }

    pub fn anonymous() -> Self {
        Self::new([LookPermission::ViewPublished])
    }
}

impl Account for Permissions {
    fn has_permission(&self, permission: LookPermission) -> bool {
        self.0.contains(&permission)
    }
}

fn allowed(account: &dyn Account, permission: LookPermission) -> bool {
    account.has_permission(LookPermission::Administer) || account.has_permission(permission)
}

/// Whether `account` may see a look in the given published state.
pub fn can_view(account: Option<&dyn Account>, published: bool) -> bool {
    match account {
        Some(account) if published => allowed(account, LookPermission::ViewPublished),
        Some(account) => allowed(account, LookPermission::ViewUnpublished),
        None => published,
    }
}

pub fn check_access(account: &dyn Account, operation: LookOperation, look: &LookNode) -> bool {
    match operation {
        LookOperation::View => can_view(Some(account), look.published),
        LookOperation::Update => allowed(account, LookPermission::Edit),
        LookOperation::Delete => allowed(account, LookPermission::Delete),
        LookOperation::RevertRevision => allowed(account, LookPermission::RevertRevisions),
        LookOperation::DeleteRevision => allowed(account, LookPermission::DeleteRevisions),
    }
}

pub fn check_create_access(account: &dyn Account) -> bool {
    allowed(account, LookPermission::Add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use looks_core::{LookId, LookUuid, RevisionId};

    fn look(published: bool) -> LookNode {
        LookNode {
            id: LookId::new(1),
            uuid: LookUuid::new(),
            revision_id: RevisionId::new(1),
            name: "summer".into(),
            parent: None,
            weight: 0,
            published,
            owner: None,
            created_at: 0,
            changed_at: 0,
            fields: Default::default(),
        }
    }

    #[test]
    fn administer_grants_everything() {
        let admin = Permissions::administrator();
        for op in [
            LookOperation::View,
            LookOperation::Update,
            LookOperation::Delete,
            LookOperation::RevertRevision,
            LookOperation::DeleteRevision,
        ] {
            assert!(check_access(&admin, op, &look(false)));
        }
        assert!(check_create_access(&admin));
    }

    #[test]
    fn unpublished_needs_its_own_permission() {
        let visitor = Permissions::anonymous();
        assert!(check_access(&visitor, LookOperation::View, &look(true)));
        assert!(!check_access(&visitor, LookOperation::View, &look(false)));
        assert!(!check_access(&visitor, LookOperation::Update, &look(true)));

        let editor = Permissions::new([LookPermission::ViewUnpublished, LookPermission::Edit]);
        assert!(check_access(&editor, LookOperation::View, &look(false)));
        assert!(check_access(&editor, LookOperation::Update, &look(false)));
        assert!(!check_create_access(&editor));
    }

    #[test]
    fn no_account_sees_only_published() {
        assert!(can_view(None, true));
        assert!(!can_view(None, false));
    }
}
