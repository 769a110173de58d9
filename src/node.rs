//! The cached catalog tree: objects own fields, fields own options.
//!
//! Parent links are handles into the owning [`MetadataCache`](crate::MetadataCache),
//! not references. A handle also records the tree generation it was issued
//! for, so a handle that outlives an object-tier reload is detected instead
//! of silently pointing at whatever now sits at the same index.

use std::fmt;

/// Handle to an [`ObjectNode`] in a specific tree generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub(crate) generation: u64,
    pub(crate) index: usize,
}

impl ObjectId {
    /// Position of the object in the cached object list.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Handle to a [`FieldNode`] under a specific object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub(crate) object: ObjectId,
    pub(crate) revision: u64,
    pub(crate) index: usize,
}

impl FieldId {
    /// The owning object.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Position of the field within its object.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}@{}", self.index, self.generation)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/field#{}", self.object, self.index)
    }
}

/// A domain object in the cache.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    pub(crate) id: ObjectId,
    pub(crate) identifier: String,
    pub(crate) display_label: String,
    pub(crate) children: Vec<FieldNode>,
    pub(crate) loaded: bool,
    /// Bumped whenever `children` is replaced or cleared.
    pub(crate) revision: u64,
}

impl ObjectNode {
    pub(crate) fn new(id: ObjectId, identifier: String, display_label: String) -> Self {
        Self {
            id,
            identifier,
            display_label,
            children: Vec::new(),
            loaded: false,
            revision: 0,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    /// Enumerated fields of this object. Empty until [`is_loaded`](Self::is_loaded).
    pub fn fields(&self) -> &[FieldNode] {
        &self.children
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Look a field up by its identifier, e.g. to restore a selection after a reload.
    pub fn field(&self, identifier: &str) -> Option<&FieldNode> {
        self.children.iter().find(|f| f.identifier == identifier)
    }

    pub(crate) fn reset(&mut self) {
        self.children.clear();
        self.loaded = false;
        self.revision += 1;
    }

    /// Handle for the field that will sit at `index` after the next fields load.
    pub(crate) fn next_field_id(&self, index: usize) -> FieldId {
        FieldId {
            object: self.id,
            revision: self.revision + 1,
            index,
        }
    }

    /// Install a freshly fetched field list, replacing the old one wholesale.
    pub(crate) fn replace_fields(&mut self, fields: Vec<FieldNode>) {
        self.children = fields;
        self.loaded = true;
        self.revision += 1;
    }
}

/// An enumerated field in the cache.
#[derive(Debug, Clone)]
pub struct FieldNode {
    pub(crate) id: FieldId,
    pub(crate) identifier: String,
    pub(crate) display_label: String,
    pub(crate) global_set_name: Option<String>,
    pub(crate) children: Vec<OptionNode>,
    pub(crate) loaded: bool,
}

impl FieldNode {
    pub(crate) fn new(id: FieldId, identifier: String, display_label: String) -> Self {
        Self {
            id,
            identifier,
            display_label,
            global_set_name: None,
            children: Vec::new(),
            loaded: false,
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    /// The owning object.
    pub fn parent(&self) -> ObjectId {
        self.id.object
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    /// Name of the shared value set, or `None` for a private one.
    ///
    /// Only meaningful once the options have been loaded.
    pub fn global_set_name(&self) -> Option<&str> {
        self.global_set_name.as_deref()
    }

    pub fn options(&self) -> &[OptionNode] {
        &self.children
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn reset(&mut self) {
        self.children.clear();
        self.loaded = false;
    }
}

/// One option of a field's value set.
#[derive(Debug, Clone)]
pub struct OptionNode {
    pub(crate) value: i32,
    pub(crate) label: String,
    pub(crate) description: Option<String>,
    pub(crate) parent: FieldId,
}

impl OptionNode {
    pub fn new(value: i32, label: impl Into<String>, description: Option<String>, parent: FieldId) -> Self {
        Self {
            value,
            label: label.into(),
            description,
            parent,
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parent(&self) -> FieldId {
        self.parent
    }

    /// The `(value, label, description)` triple, ignoring which field owns the option.
    pub fn content(&self) -> (i32, &str, Option<&str>) {
        (self.value, &self.label, self.description.as_deref())
    }

    /// Copy of this option owned by another field.
    pub(crate) fn reparented(&self, parent: FieldId) -> Self {
        Self {
            parent,
            ..self.clone()
        }
    }
}

/// Returns true when both lists hold the same options in the same order.
pub fn same_options(a: &[OptionNode], b: &[OptionNode]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.content() == y.content())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_id(object: usize, field: usize) -> FieldId {
        FieldId {
            object: ObjectId {
                generation: 1,
                index: object,
            },
            revision: 1,
            index: field,
        }
    }

    #[test]
    fn reparented_keeps_content() {
        let option = OptionNode::new(1, "Tech", Some("Technology".into()), field_id(0, 0));
        let copy = option.reparented(field_id(1, 0));
        assert_eq!(copy.content(), option.content());
        assert_eq!(copy.parent(), field_id(1, 0));
    }

    #[test]
    fn same_options_ignores_parent() {
        let a = vec![OptionNode::new(1, "Tech", None, field_id(0, 0))];
        let b = vec![OptionNode::new(1, "Tech", None, field_id(1, 3))];
        assert!(same_options(&a, &b));

        let c = vec![OptionNode::new(1, "Technology", None, field_id(1, 3))];
        assert!(!same_options(&a, &c));
        assert!(!same_options(&a, &[]));
    }

    #[test]
    fn object_field_lookup_by_identifier() {
        let id = ObjectId {
            generation: 1,
            index: 0,
        };
        let mut object = ObjectNode::new(id, "account".into(), "Account".into());
        let field = FieldNode::new(object.next_field_id(0), "industrycode".into(), "Industry".into());
        object.replace_fields(vec![field]);

        assert!(object.is_loaded());
        assert_eq!(object.field("industrycode").map(|f| f.id()), Some(object.fields()[0].id()));
        assert_eq!(object.fields()[0].id().revision, object.revision);
        assert!(object.field("statuscode").is_none());

        object.reset();
        assert!(!object.is_loaded());
        assert!(object.fields().is_empty());
        assert_eq!(object.revision, 2);
    }

    #[test]
    fn handle_display() {
        assert_eq!(field_id(2, 5).to_string(), "object#2@1/field#5");
    }
}
