//! Catalog records as returned by a metadata gateway.

use serde::{Deserialize, Serialize};

/// A domain object as listed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Stable logical name, unique within a container.
    pub identifier: String,
    /// Localized display label. `None` when the catalog has no label for the user.
    #[serde(default)]
    pub display_label: Option<String>,
    #[serde(default)]
    pub is_managed: bool,
    #[serde(default = "default_true")]
    pub is_customizable: bool,
}

impl ObjectSummary {
    /// Whether this object may appear in the browsable object list.
    ///
    /// System-managed objects are only kept when they are still customizable,
    /// and objects without a resolvable label are never shown.
    pub fn is_listable(&self) -> bool {
        (!self.is_managed || self.is_customizable) && resolvable_label(&self.display_label).is_some()
    }
}

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValueType {
    /// Enumerated single-select.
    Picklist,
    /// Enumerated multi-select.
    MultiSelectPicklist,
    Boolean,
    String,
    Integer,
    Decimal,
    DateTime,
    Lookup,
    #[serde(other)]
    Other,
}

/// A field of a domain object as listed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub identifier: String,
    #[serde(default)]
    pub display_label: Option<String>,
    pub value_type: FieldValueType,
}

impl FieldSummary {
    /// Only labelled single-select picklists carry an editable value set.
    pub fn is_enumerated(&self) -> bool {
        self.value_type == FieldValueType::Picklist && resolvable_label(&self.display_label).is_some()
    }
}

/// One option of a value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    /// Missing values are read as `0`.
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Value-set metadata for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValueSetDescriptor {
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub values: Vec<OptionValue>,
}

impl ValueSetDescriptor {
    /// The shared name of this value set, if it is global.
    ///
    /// A set flagged global without a name cannot be matched against other
    /// fields and is treated as private.
    pub fn global_set_name(&self) -> Option<&str> {
        if !self.is_global {
            return None;
        }
        self.global_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Returns the label if it is present and not blank.
pub fn resolvable_label(label: &Option<String>) -> Option<&str> {
    label.as_deref().filter(|l| !l.trim().is_empty())
}

fn default_true() -> bool {
    true
}
