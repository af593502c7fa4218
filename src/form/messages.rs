//! Per-field validation messages shown next to form inputs.
//!
//! Every mutation builds a new map and publishes it through a `watch`
//! channel, so views holding a receiver always see a complete snapshot.

use crate::schema::CompiledSchema;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::watch;

/// `section.field -> message`.
pub type Messages = BTreeMap<String, String>;

#[derive(Debug)]
pub struct MessageState {
    declared: BTreeSet<String>,
    tx: watch::Sender<Arc<Messages>>,
}

impl MessageState {
    /// Message state accepting keys for the fields declared in `schema`.
    pub fn new(schema: &CompiledSchema) -> Self {
        let declared = schema
            .sections()
            .iter()
            .flat_map(|section| {
                section
                    .fields()
                    .iter()
                    .map(move |field| path(section.name(), field.name()))
            })
            .collect();
        let (tx, _rx) = watch::channel(Arc::new(Messages::new()));
        Self { declared, tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Messages>> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Messages> {
        self.tx.borrow().clone()
    }

    pub fn get(&self, section: &str, field: &str) -> Option<String> {
        self.tx.borrow().get(&path(section, field)).cloned()
    }

    /// Record a message. Returns `false` for fields outside the schema.
    pub fn set(&self, section: &str, field: &str, message: impl Into<String>) -> bool {
        let key = path(section, field);
        if !self.declared.contains(&key) {
            tracing::debug!(key, "ignoring message for undeclared field");
            return false;
        }
        let message = message.into();
        self.publish(|messages| {
            messages.insert(key, message);
        });
        true
    }

    pub fn clear(&self, section: &str, field: &str) {
        let key = path(section, field);
        if !self.tx.borrow().contains_key(&key) {
            return;
        }
        self.publish(|messages| {
            messages.remove(&key);
        });
    }

    /// Replace every message of `section` with `messages` (keyed `section.field`).
    pub fn replace_section(&self, section: &str, section_messages: &Messages) {
        let prefix = format!("{section}.");
        self.publish(|messages| {
            messages.retain(|key, _| !key.starts_with(&prefix));
            for (key, message) in section_messages {
                if key.starts_with(&prefix) && self.declared.contains(key) {
                    messages.insert(key.clone(), message.clone());
                }
            }
        });
    }

    pub fn clear_section(&self, section: &str) {
        self.replace_section(section, &Messages::new());
    }

    fn publish(&self, mutate: impl FnOnce(&mut Messages)) {
        let mut next = Messages::clone(&self.tx.borrow());
        mutate(&mut next);
        self.tx.send_replace(Arc::new(next));
    }
}

fn path(section: &str, field: &str) -> String {
    format!("{section}.{field}")
}
