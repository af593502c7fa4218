use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute bag of a record, keyed by attribute name.
pub type Attributes = BTreeMap<String, Value>;

/// Attributes that differ from the last committed state: name -> (old, new).
///
/// An attribute that did not exist before reports `Value::Null` as its old value.
pub type ChangedAttributes = BTreeMap<String, (Value, Value)>;

/// A model instance held by the client: a typed attribute bag plus the
/// snapshot it was last loaded or saved with.
///
/// A deserialized record is committed: its attributes are its pristine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct Record {
    model: String,
    id: Option<String>,
    attributes: Attributes,
    #[serde(skip)]
    pristine: Attributes,
}

#[derive(Deserialize)]
struct StoredRecord {
    model: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: Attributes,
}

impl From<StoredRecord> for Record {
    fn from(stored: StoredRecord) -> Self {
        Self {
            model: stored.model,
            id: stored.id,
            pristine: stored.attributes.clone(),
            attributes: stored.attributes,
        }
    }
}

impl Record {
    /// Create an unsaved record with no attributes.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: None,
            attributes: Attributes::new(),
            pristine: Attributes::new(),
        }
    }

    /// Create an unsaved record whose seeded attributes do not count as changes.
    ///
    /// Routes seed defaults (the tracked project, a default priority) before the
    /// form is shown; those are not user edits.
    pub fn with_defaults(model: impl Into<String>, defaults: Attributes) -> Self {
        Self {
            model: model.into(),
            id: None,
            pristine: defaults.clone(),
            attributes: defaults,
        }
    }

    /// Rebuild a record from server data. The loaded state is the pristine state.
    pub fn loaded(model: impl Into<String>, id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            model: model.into(),
            id: Some(id.into()),
            pristine: attributes.clone(),
            attributes,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String view of an attribute. Numbers and booleans are not coerced.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Attributes that differ from the pristine snapshot.
    pub fn changed_attributes(&self) -> ChangedAttributes {
        let mut changed = ChangedAttributes::new();
        for (name, value) in &self.attributes {
            match self.pristine.get(name) {
                Some(old) if old == value => {}
                Some(old) => {
                    changed.insert(name.clone(), (old.clone(), value.clone()));
                }
                None => {
                    changed.insert(name.clone(), (Value::Null, value.clone()));
                }
            }
        }
        for (name, old) in &self.pristine {
            if !self.attributes.contains_key(name) {
                changed.insert(name.clone(), (old.clone(), Value::Null));
            }
        }
        changed
    }

    /// Accept the current attributes as the pristine state.
    pub fn commit(&mut self) {
        self.pristine = self.attributes.clone();
    }

    /// Discard uncommitted changes.
    pub fn rollback(&mut self) {
        self.attributes = self.pristine.clone();
    }
}
