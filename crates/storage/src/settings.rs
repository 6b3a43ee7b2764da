use std::collections::BTreeMap;

use looks_core::LookId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAPPING_WEIGHT: i64 = 50;

pub(crate) const KEY_DEFAULT: &str = "default";
pub(crate) const KEY_DEFAULT_ADMIN: &str = "default_admin";
pub(crate) const KEY_MAPPING: &str = "mapping";

/// Where a theme places the value of one look field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub selector: String,
    pub weight: i64,
}

impl FieldMapping {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            weight: DEFAULT_MAPPING_WEIGHT,
        }
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }
}

/// Persisted look settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookSettings {
    pub default: Option<LookId>,
    pub default_admin: Option<LookId>,
    /// theme name -> field name -> mapping
    pub mapping: BTreeMap<String, BTreeMap<String, FieldMapping>>,
}

impl LookSettings {
    pub fn default_look(&self, admin_route: bool) -> Option<LookId> {
        if admin_route {
            self.default_admin
        } else {
            self.default
        }
    }

    /// Mappings for `theme` ordered by `(weight, field name)`.
    pub fn theme_mapping(&self, theme: &str) -> Vec<(&str, &FieldMapping)> {
        let mut rows: Vec<(&str, &FieldMapping)> = self
            .mapping
            .get(theme)
            .map(|fields| fields.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.1.weight.cmp(&b.1.weight).then_with(|| a.0.cmp(b.0)));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_look_depends_on_route_kind() {
        let settings = LookSettings {
            default: Some(LookId::new(1)),
            default_admin: Some(LookId::new(2)),
            ..Default::default()
        };
        assert_eq!(settings.default_look(false), Some(LookId::new(1)));
        assert_eq!(settings.default_look(true), Some(LookId::new(2)));
    }

    #[test]
    fn theme_mapping_sorted_by_weight_then_name() {
        let mut fields = BTreeMap::new();
        fields.insert("field_b".to_string(), FieldMapping::new(".b").with_weight(1));
        fields.insert("field_a".to_string(), FieldMapping::new(".a").with_weight(1));
        fields.insert("field_c".to_string(), FieldMapping::new(".c").with_weight(-5));
        let mut settings = LookSettings::default();
        settings.mapping.insert("olivero".to_string(), fields);

        let names: Vec<&str> = settings
            .theme_mapping("olivero")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["field_c", "field_a", "field_b"]);
        assert!(settings.theme_mapping("claro").is_empty());
    }
}
