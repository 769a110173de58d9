//! Export of the loaded value sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, MetadataCache};
use crate::node::{FieldNode, ObjectNode, OptionNode};

/// Serializable view of everything the cache has loaded so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSetMapping {
    /// Container the object list was loaded for, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub container: Option<String>,
    pub objects: Vec<ObjectMapping>,
    /// Global set name to the `object/field` paths that reference it.
    pub global_sets: BTreeMap<String, Vec<String>>,
    #[serde(skip_deserializing)]
    pub stats: Option<MappingStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMapping {
    pub identifier: String,
    pub display_label: String,
    pub fields: Vec<FieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub identifier: String,
    pub display_label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub global_set_name: Option<String>,
    pub options: Vec<OptionMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMapping {
    pub value: i32,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

/// Work counters copied from [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingStats {
    pub value_set_requests: u64,
    pub value_sets_reused: u64,
}

impl From<CacheStats> for MappingStats {
    fn from(stats: CacheStats) -> Self {
        Self {
            value_set_requests: stats.value_set_requests,
            value_sets_reused: stats.value_sets_reused,
        }
    }
}

impl ValueSetMapping {
    /// Build the mapping from the loaded part of the cache.
    ///
    /// Objects whose fields were never loaded are skipped, as are fields
    /// whose options were never loaded.
    pub fn from_cache(cache: &MetadataCache) -> Self {
        let mut global_sets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let objects = cache
            .objects()
            .iter()
            .filter(|o| o.is_loaded())
            .map(|object| {
                for field in object.fields().iter().filter(|f| f.is_loaded()) {
                    if let Some(name) = field.global_set_name() {
                        global_sets
                            .entry(name.to_string())
                            .or_default()
                            .push(format!("{}/{}", object.identifier(), field.identifier()));
                    }
                }
                ObjectMapping::from(object)
            })
            .collect();

        Self {
            container: cache.container().map(str::to_owned),
            objects,
            global_sets,
            stats: Some(cache.stats().into()),
        }
    }

    /// Options exported for `object/field`, if present.
    pub fn options(&self, object: &str, field: &str) -> Option<&[OptionMapping]> {
        self.objects
            .iter()
            .find(|o| o.identifier == object)?
            .fields
            .iter()
            .find(|f| f.identifier == field)
            .map(|f| f.options.as_slice())
    }
}

impl From<&ObjectNode> for ObjectMapping {
    fn from(object: &ObjectNode) -> Self {
        Self {
            identifier: object.identifier().to_string(),
            display_label: object.display_label().to_string(),
            fields: object
                .fields()
                .iter()
                .filter(|f| f.is_loaded())
                .map(FieldMapping::from)
                .collect(),
        }
    }
}

impl From<&FieldNode> for FieldMapping {
    fn from(field: &FieldNode) -> Self {
        Self {
            identifier: field.identifier().to_string(),
            display_label: field.display_label().to_string(),
            global_set_name: field.global_set_name().map(str::to_owned),
            options: field.options().iter().map(OptionMapping::from).collect(),
        }
    }
}

impl From<&OptionNode> for OptionMapping {
    fn from(option: &OptionNode) -> Self {
        Self {
            value: option.value(),
            label: option.label().to_string(),
            description: option.description().map(str::to_owned),
        }
    }
}
