//! The read-only view of an incoming request that signal extractors consult.

use crate::access::Account;

/// An entity attached to the current route.
pub trait RouteEntity {
    fn has_field(&self, field_name: &str) -> bool;

    /// Target id of a reference field, if set.
    fn reference_target(&self, field_name: &str) -> Option<i64>;
}

pub trait RequestContext {
    fn query(&self, key: &str) -> Option<&str>;

    fn form(&self, key: &str) -> Option<&str>;

    fn cookie(&self, key: &str) -> Option<&str>;

    fn route_name(&self) -> Option<&str>;

    /// The route parameter holding an entity of `entity_type`.
    fn route_entity(&self, entity_type: &str) -> Option<&dyn RouteEntity>;

    /// Current path, starting with `/`.
    fn path(&self) -> &str;

    fn is_front_page(&self) -> bool {
        self.path() == "/"
    }

    fn is_admin_route(&self) -> bool;

    fn account(&self) -> Option<&dyn Account> {
        None
    }
}
