use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field_value::FieldValue;
use crate::ids::{LookId, LookUuid, RevisionId, UserId};

/// New looks sort after every look that has been placed explicitly.
pub const DEFAULT_WEIGHT: i64 = 1_000_000;

/// Field holding the theme name a look switches to.
pub const THEME_FIELD: &str = "look_theme";

/// Field holding the request path patterns a look applies to.
pub const PATH_FIELD: &str = "look_path";

/// Configurable (non-base) field values of a look, keyed by field name.
pub type LookFields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookNode {
    pub id: LookId,
    pub uuid: LookUuid,
    pub revision_id: RevisionId,
    pub name: String,
    pub parent: Option<LookId>,
    pub weight: i64,
    pub published: bool,
    pub owner: Option<UserId>,
    pub created_at: i64,
    pub changed_at: i64,
    /// Every registered field is present; unset ones hold `FieldValue::Null`.
    pub fields: LookFields,
}

impl LookNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The value of `field_name`, or `None` when the look leaves it empty.
    pub fn field(&self, field_name: &str) -> Option<&FieldValue> {
        self.fields.get(field_name).filter(|v| !v.is_empty())
    }
}

/// Values for a look that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLook {
    pub name: String,
    pub parent: Option<LookId>,
    pub weight: i64,
    pub published: bool,
    pub owner: Option<UserId>,
    pub fields: LookFields,
}

impl NewLook {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            weight: DEFAULT_WEIGHT,
            published: true,
            owner: None,
            fields: LookFields::new(),
        }
    }

    pub fn with_parent(mut self, parent: LookId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    pub fn with_field(mut self, field_name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(field_name.into(), value);
        self
    }
}

/// An immutable snapshot of a look taken at save time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookRevision {
    pub revision_id: RevisionId,
    pub look_id: LookId,
    pub name: String,
    pub parent: Option<LookId>,
    pub weight: i64,
    pub published: bool,
    pub fields: LookFields,
    pub author: Option<UserId>,
    pub log_message: Option<String>,
    pub created_at: i64,
}

/// One row of the flat listing ordered by `(weight, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: LookId,
    pub name: String,
    pub parent: Option<LookId>,
    pub weight: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeUpdate {
    pub id: LookId,
    pub parent: Option<LookId>,
    pub weight: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    LookRef,
    EntityRef,
    List,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::LookRef => "look_ref",
            Self::EntityRef => "entity_ref",
            Self::List => "list",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "text" => Ok(Self::Text),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "look_ref" => Ok(Self::LookRef),
            "entity_ref" => Ok(Self::EntityRef),
            "list" => Ok(Self::List),
            _ => Err(CoreError::InvalidData(format!("unknown field kind: {s}"))),
        }
    }

    /// Whether a value can be stored in a field of this kind. `Null` fits
    /// every kind.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (_, FieldValue::Null)
                | (Self::Text, FieldValue::Text(_))
                | (Self::Integer, FieldValue::Integer(_))
                | (Self::Float, FieldValue::Float(_))
                | (Self::Boolean, FieldValue::Boolean(_))
                | (Self::LookRef, FieldValue::LookRef(_))
                | (Self::EntityRef, FieldValue::EntityRef { .. })
                | (Self::List, FieldValue::List(_))
        )
    }

    /// Reference fields are the ones a theme may map to page selectors.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::LookRef | Self::EntityRef)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
        }
    }
}
