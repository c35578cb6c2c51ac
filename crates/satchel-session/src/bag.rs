//! The session bag contract and the general-purpose attribute bag.

use std::any::Any;

use serde_json::{Map, Value};

/// A named, independently-owned partition of session data.
///
/// Bags are registered on a [`Session`](crate::Session) before it starts and
/// are (re-)initialized from their storage-key slice of the loaded snapshot.
/// The registry holds bags as boxed trait objects; `as_any`/`as_any_mut`
/// allow callers to recover the concrete type.
pub trait SessionBag: Send {
    /// Registry name of the bag.
    fn name(&self) -> &str;

    /// Key under which this bag's section is stored in the serialized
    /// session payload.
    fn storage_key(&self) -> &str;

    /// Load the bag's contents from its section of the snapshot.
    fn initialize(&mut self, section: Map<String, Value>);

    /// Drop all contents in place.
    fn clear(&mut self);

    /// Serialize the bag's current contents as a section mapping.
    fn to_map(&self) -> Map<String, Value>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Default registry name of the attribute bag every session carries.
pub const ATTRIBUTES_BAG: &str = "attributes";

/// General key/value session attributes.
#[derive(Debug, Clone, Default)]
pub struct AttributeBag {
    name: String,
    storage_key: String,
    attributes: Map<String, Value>,
}

impl AttributeBag {
    /// Create the default attribute bag.
    pub fn new() -> Self {
        Self::with_name(ATTRIBUTES_BAG)
    }

    /// Create an attribute bag with a custom registry/storage name.
    pub fn with_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            storage_key: name.clone(),
            name,
            attributes: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// All attributes, by reference.
    pub fn all(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Replace the whole attribute mapping.
    pub fn replace(&mut self, attributes: Map<String, Value>) {
        self.attributes = attributes;
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl SessionBag for AttributeBag {
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn initialize(&mut self, section: Map<String, Value>) {
        self.attributes = section;
    }

    fn clear(&mut self) {
        self.attributes.clear();
    }

    fn to_map(&self) -> Map<String, Value> {
        self.attributes.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_crud() {
        let mut bag = AttributeBag::new();
        assert_eq!(bag.name(), ATTRIBUTES_BAG);
        assert!(bag.is_empty());

        bag.set("user_id", 42);
        bag.set("theme", "dark");

        assert!(bag.has("user_id"));
        assert_eq!(bag.get("user_id"), Some(&json!(42)));
        assert_eq!(bag.remove("theme"), Some(json!("dark")));
        assert!(!bag.has("theme"));
    }

    #[test]
    fn test_initialize_replaces_contents() {
        let mut bag = AttributeBag::new();
        bag.set("stale", true);

        let mut section = Map::new();
        section.insert("fresh".into(), json!(1));
        bag.initialize(section);

        assert!(!bag.has("stale"));
        assert!(bag.has("fresh"));
    }

    #[test]
    fn test_clear_and_to_map() {
        let mut bag = AttributeBag::with_name("flash");
        assert_eq!(bag.storage_key(), "flash");

        bag.set("notice", "saved");
        assert_eq!(bag.to_map().len(), 1);

        bag.clear();
        assert!(bag.to_map().is_empty());
    }
}
