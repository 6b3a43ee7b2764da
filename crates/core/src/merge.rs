use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field_value::FieldValue;
use crate::ids::LookId;
use crate::look::{LookNode, THEME_FIELD};

/// Merged configuration keyed by config key.
pub type LookConfig = BTreeMap<String, FieldValue>;

/// The configuration of one look after inheritance has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLook {
    pub look_id: LookId,
    pub look_name: String,
    pub config: LookConfig,
}

impl ResolvedLook {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.config.get(key)
    }

    pub fn theme(&self) -> Option<&str> {
        self.get(config_key(THEME_FIELD))
            .and_then(FieldValue::as_text)
            .filter(|theme| !theme.is_empty())
    }
}

/// Folds one look's value for one field into the running configuration.
///
/// Implementations must be pure: the same look, field and accumulator always
/// produce the same result. The merger calls this once per look in root to
/// leaf order, so "later wins" gives child-overrides-parent semantics.
pub trait FieldModifiers: Send + Sync {
    fn extract(&self, look: &LookNode, field_name: &str, config: LookConfig) -> LookConfig;
}

/// Config key for a field name: `field_look_theme` and `look_theme` both
/// map to `look_theme`.
pub fn config_key(field_name: &str) -> &str {
    field_name.strip_prefix("field_").unwrap_or(field_name)
}

/// Lists extend the inherited list, everything else replaces it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModifiers;

impl FieldModifiers for DefaultModifiers {
    fn extract(&self, look: &LookNode, field_name: &str, mut config: LookConfig) -> LookConfig {
        let Some(value) = look.field(field_name) else {
            return config;
        };
        let key = config_key(field_name).to_string();
        let merged = match (config.remove(&key), value) {
            (Some(FieldValue::List(mut inherited)), FieldValue::List(items)) => {
                for item in items {
                    if !item.is_empty() && !inherited.contains(item) {
                        inherited.push(item.clone());
                    }
                }
                FieldValue::List(inherited)
            }
            _ => value.clone(),
        };
        config.insert(key, merged);
        config
    }
}

pub struct ConfigMerger<'m> {
    modifiers: &'m dyn FieldModifiers,
}

impl<'m> ConfigMerger<'m> {
    pub fn new(modifiers: &'m dyn FieldModifiers) -> Self {
        Self { modifiers }
    }

    /// Merge a chain ordered root first, leaf last.
    ///
    /// All looks share one field schema, so the leaf's field set drives the
    /// fold. Looks that leave a field empty are skipped for that field.
    pub fn merge(&self, chain_root_first: &[LookNode]) -> LookConfig {
        let mut config = LookConfig::new();
        let Some(leaf) = chain_root_first.last() else {
            return config;
        };
        for field_name in leaf.fields.keys() {
            for look in chain_root_first {
                if look.field(field_name).is_none() {
                    continue;
                }
                config = self.modifiers.extract(look, field_name, config);
            }
        }
        config
    }

    /// Resolve an ancestor chain as returned by storage (leaf first).
    pub fn resolve(&self, chain_leaf_first: &[LookNode]) -> Option<ResolvedLook> {
        let leaf = chain_leaf_first.first()?;
        let root_first: Vec<LookNode> = chain_leaf_first.iter().rev().cloned().collect();
        Some(ResolvedLook {
            look_id: leaf.id,
            look_name: leaf.name.clone(),
            config: self.merge(&root_first),
        })
    }
}
