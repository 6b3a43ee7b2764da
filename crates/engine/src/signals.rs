use looks_core::{LookId, PATH_FIELD};
use looks_storage::{LookStorage, StorageError};
use tracing::debug;

use crate::access;
use crate::context::RequestContext;
use crate::path::PathMatcher;

/// Query, form and cookie key naming a look.
pub const LOOK_PARAMETER: &str = "look";

/// Reference field on content entities pointing at a look.
pub const ENTITY_LOOK_FIELD: &str = "field_look";

/// Everything an extractor may consult.
pub struct Signals<'a> {
    pub request: &'a dyn RequestContext,
    pub storage: &'a dyn LookStorage,
    pub path_matcher: &'a dyn PathMatcher,
}

/// One step of the resolution cascade. Yields a look id or abstains.
pub trait SignalExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_extract(&self, signals: &Signals<'_>) -> Result<Option<LookId>, StorageError>;
}

/// query, form, cookie, entity, path rule, default
pub fn default_cascade() -> Vec<Box<dyn SignalExtractor>> {
    vec![
        Box::new(ParameterExtractor::new(ParameterSource::Query)),
        Box::new(ParameterExtractor::new(ParameterSource::Form)),
        Box::new(ParameterExtractor::new(ParameterSource::Cookie)),
        Box::new(EntityExtractor::default()),
        Box::new(PathRuleExtractor::default()),
        Box::new(DefaultExtractor),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    Query,
    Form,
    Cookie,
}

/// Looks up a look by name taken from a request parameter.
#[derive(Debug, Clone)]
pub struct ParameterExtractor {
    source: ParameterSource,
    key: String,
}

impl ParameterExtractor {
    pub fn new(source: ParameterSource) -> Self {
        Self {
            source,
            key: LOOK_PARAMETER.to_string(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

impl SignalExtractor for ParameterExtractor {
    fn name(&self) -> &'static str {
        match self.source {
            ParameterSource::Query => "query",
            ParameterSource::Form => "form",
            ParameterSource::Cookie => "cookie",
        }
    }

    fn try_extract(&self, signals: &Signals<'_>) -> Result<Option<LookId>, StorageError> {
        let request = signals.request;
        let value = match self.source {
            ParameterSource::Query => request.query(&self.key),
            ParameterSource::Form => request.form(&self.key),
            ParameterSource::Cookie => request.cookie(&self.key),
        };
        let Some(name) = value.filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        let Some(found) = signals.storage.find_by_name(name)? else {
            debug!(source = self.name(), look_name = name, "no look with that name");
            return Ok(None);
        };
        if !access::can_view(request.account(), found.published) {
            debug!(source = self.name(), look_id = %found.id, "unpublished look not visible");
            return Ok(None);
        }
        Ok(Some(found.id))
    }
}

/// Follows the look reference of the entity the current route renders.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    field_name: String,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self {
            field_name: ENTITY_LOOK_FIELD.to_string(),
        }
    }
}

/// `entity.<type>.canonical` and `entity.<type>.latest_version`.
fn routed_entity_type(route_name: &str) -> Option<&str> {
    let mut parts = route_name.split('.');
    let (Some("entity"), Some(entity_type), Some("canonical" | "latest_version"), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    (!entity_type.is_empty()).then_some(entity_type)
}

impl SignalExtractor for EntityExtractor {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn try_extract(&self, signals: &Signals<'_>) -> Result<Option<LookId>, StorageError> {
        let request = signals.request;
        let Some(entity_type) = request.route_name().and_then(routed_entity_type) else {
            return Ok(None);
        };
        let Some(entity) = request.route_entity(entity_type) else {
            return Ok(None);
        };
        if !entity.has_field(&self.field_name) {
            return Ok(None);
        }
        Ok(entity
            .reference_target(&self.field_name)
            .and_then(LookId::from_raw))
    }
}

/// First look, in storage order, whose path patterns match the request.
#[derive(Debug, Clone)]
pub struct PathRuleExtractor {
    field_name: String,
}

impl Default for PathRuleExtractor {
    fn default() -> Self {
        Self {
            field_name: PATH_FIELD.to_string(),
        }
    }
}

impl SignalExtractor for PathRuleExtractor {
    fn name(&self) -> &'static str {
        "path"
    }

    fn try_extract(&self, signals: &Signals<'_>) -> Result<Option<LookId>, StorageError> {
        for (id, patterns) in signals.storage.text_field_rules(&self.field_name)? {
            if signals.path_matcher.matches(&patterns, signals.request) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

/// The configured default, or the admin default on administrative routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl SignalExtractor for DefaultExtractor {
    fn name(&self) -> &'static str {
        "default"
    }

    fn try_extract(&self, signals: &Signals<'_>) -> Result<Option<LookId>, StorageError> {
        let settings = signals.storage.load_settings()?;
        Ok(settings.default_look(signals.request.is_admin_route()))
    }
}
