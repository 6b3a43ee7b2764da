use std::collections::HashMap;

use looks_engine::{Account, Permissions, RequestContext, RouteEntity};

/// A content entity bound to the route.
#[derive(Debug, Clone, Default)]
pub struct FakeEntity {
    references: HashMap<String, Option<i64>>,
}

impl FakeEntity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `field_name`, optionally pointing at `target`.
    pub fn with_reference(mut self, field_name: &str, target: Option<i64>) -> Self {
        self.references.insert(field_name.to_string(), target);
        self
    }
}

impl RouteEntity for FakeEntity {
    fn has_field(&self, field_name: &str) -> bool {
        self.references.contains_key(field_name)
    }

    fn reference_target(&self, field_name: &str) -> Option<i64> {
        self.references.get(field_name).copied().flatten()
    }
}

/// Builder for request contexts.
#[derive(Debug, Clone)]
pub struct FakeRequest {
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    cookies: HashMap<String, String>,
    route_name: Option<String>,
    entities: HashMap<String, FakeEntity>,
    path: String,
    admin_route: bool,
    account: Option<Permissions>,
}

impl Default for FakeRequest {
    fn default() -> Self {
        Self {
            query: HashMap::new(),
            form: HashMap::new(),
            cookies: HashMap::new(),
            route_name: None,
            entities: HashMap::new(),
            path: "/".to_string(),
            admin_route: false,
            account: None,
        }
    }
}

impl FakeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(path: &str) -> Self {
        Self::new().with_path(path)
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_form(mut self, key: &str, value: &str) -> Self {
        self.form.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_cookie(mut self, key: &str, value: &str) -> Self {
        self.cookies.insert(key.to_string(), value.to_string());
        self
    }

    /// Route `entity.<type>.canonical` rendering `entity`.
    pub fn with_entity(mut self, entity_type: &str, entity: FakeEntity) -> Self {
        self.route_name = Some(format!("entity.{entity_type}.canonical"));
        self.entities.insert(entity_type.to_string(), entity);
        self
    }

    pub fn with_route(mut self, route_name: &str) -> Self {
        self.route_name = Some(route_name.to_string());
        self
    }

    pub fn admin(mut self) -> Self {
        self.admin_route = true;
        self
    }

    pub fn with_account(mut self, account: Permissions) -> Self {
        self.account = Some(account);
        self
    }
}

impl RequestContext for FakeRequest {
    fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    fn form(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    fn cookie(&self, key: &str) -> Option<&str> {
        self.cookies.get(key).map(String::as_str)
    }

    fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    fn route_entity(&self, entity_type: &str) -> Option<&dyn RouteEntity> {
        self.entities
            .get(entity_type)
            .map(|entity| entity as &dyn RouteEntity)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn is_admin_route(&self) -> bool {
        self.admin_route
    }

    fn account(&self) -> Option<&dyn Account> {
        self.account.as_ref().map(|account| account as &dyn Account)
    }
}
