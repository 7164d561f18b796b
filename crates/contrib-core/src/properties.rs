//! Property-bag contributions.
//!
//! A general purpose contribution type for extension points whose payload is
//! free-form structured data. Overrides deep-merge objects and replace
//! everything else, so a child only needs to state what it changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contribution::{Contribution, ContributionKind};

/// A contribution carrying a JSON object of properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertiesContribution {
    /// Contribution id
    pub id: String,

    /// Id of the contribution this one overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Additional contribution ids that must be resolved first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Merge as a composite fragment rather than an independent override
    #[serde(default)]
    pub composite: bool,

    /// Payload
    #[serde(default)]
    pub properties: Map<String, Value>,

    /// Top-level keys to drop from the inherited value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl PropertiesContribution {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base: None,
            requires: Vec::new(),
            composite: false,
            properties: Map::new(),
            remove: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn requiring(mut self, id: impl Into<String>) -> Self {
        self.requires.push(id.into());
        self
    }

    pub fn composite(mut self) -> Self {
        self.composite = true;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn removing(mut self, key: impl Into<String>) -> Self {
        self.remove.push(key.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl Contribution for PropertiesContribution {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ContributionKind {
        if self.composite {
            ContributionKind::Composite
        } else {
            ContributionKind::Extensible
        }
    }

    fn base_id(&self) -> Option<&str> {
        self.base.as_deref()
    }

    fn dependencies(&self) -> Vec<String> {
        self.requires.clone()
    }

    fn copy_over(&self, target: &mut Self) {
        for key in &self.remove {
            target.properties.remove(key);
        }
        for (key, value) in &self.properties {
            match target.properties.get_mut(key) {
                Some(existing) => deep_merge_value(existing, value),
                None => {
                    target.properties.insert(key.clone(), value.clone());
                }
            }
        }
    }

    fn set_identity(&mut self, id: &str, base_id: Option<&str>) {
        self.id = id.to_string();
        self.base = base_id.map(str::to_string);
    }
}

/// Deep merge two JSON values
///
/// If both values are objects, merge them recursively with `other` taking precedence.
/// Otherwise, `other` replaces `base`.
pub fn deep_merge_value(base: &mut Value, other: &Value) {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            for (key, other_val) in other_map {
                if let Some(base_val) = base_map.get_mut(key) {
                    deep_merge_value(base_val, other_val);
                } else {
                    base_map.insert(key.clone(), other_val.clone());
                }
            }
        }
        (base, other) => {
            *base = other.clone();
        }
    }
}
