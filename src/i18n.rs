//! Localization collaborator.
//!
//! Messages are addressed by dotted keys (`errors.required`,
//! `views.app.issue.created`) and may carry `{name}` placeholders.
//! A key with no translation renders as the key itself, so a missing
//! entry is visible instead of blank.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Translation lookup used by every component that produces user-facing text.
pub trait Translator: Send + Sync {
    /// Raw template for `key`, if the catalog has one.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Translate `key`, substituting `{name}` placeholders from `args`.
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String {
        match self.lookup(key) {
            Some(template) => interpolate(&template, args),
            None => key.to_string(),
        }
    }
}

/// Replace `{name}` placeholders. Unknown placeholders are left untouched.
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in args {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

const BUILTIN_MESSAGES: &[(&str, &str)] = &[
    ("errors.required", "This field is required"),
    ("errors.email", "Please enter a valid email address"),
    ("errors.oneOf", "Must match {dependentField}"),
    ("errors.test", "This value is not valid"),
    ("global.form.cancelcicked", "You have unsaved changes. Do you want to discard them?"),
    ("global.form.confirmcancel", "Yes, discard my changes"),
    ("global.form.onsecondthought", "On second thought..."),
    ("global.form.savefailed", "The record could not be saved: {reason}"),
    ("views.signin.sessionExpired", "Your session has expired. Please sign in again."),
    ("views.signin.invalid_grant", "The username or password is incorrect"),
    ("views.signin.resetPassword.success", "Your password has been updated"),
    ("views.signin.resetPassword.error", "Your password could not be updated"),
    ("views.app.project.created", "Project {name} has been created"),
    ("views.app.issue.created", "Issue #{issueNumber} {name} has been created"),
    ("views.app.issue.updated", "Issue #{issueNumber} {name} has been updated"),
    ("views.app.wiki.created", "Page {name} has been created"),
    (
        "views.app.issue.create.validations.endDateGreaterThanStartDate",
        "End date must be later than the start date",
    ),
    ("views.app.project.list.savedsearch.delete", "Delete the saved search {name}?"),
    ("views.app.project.list.savedsearch.confirmdelete", "Delete"),
    ("views.app.project.list.savedsearch.onsecondthought", "Keep it"),
    ("views.app.project.list.savedsearch.deleted", "Saved search {name} deleted"),
    ("views.app.project.list.savedsearch.deletecancel", "Nothing was deleted"),
];

/// A flat key → template catalog.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// An empty catalog: every key renders as itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with the English messages the core emits.
    pub fn english() -> Self {
        let mut catalog = Self::new();
        for (key, value) in BUILTIN_MESSAGES {
            catalog.insert(*key, *value);
        }
        catalog
    }

    /// Parse a JSON catalog. Nested objects are flattened into dotted keys.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("Failed to parse message catalog")?;
        let mut catalog = Self::new();
        flatten_into(&mut catalog.messages, "", &value);
        Ok(catalog)
    }

    /// Load a JSON catalog from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read message catalog: {}", path.display()))?;
        Self::from_json_str(&content)
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.messages.insert(key.into(), template.into());
    }

    /// Overlay `other` on top of this catalog.
    pub fn merge(&mut self, other: MessageCatalog) {
        self.messages.extend(other.messages);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Translator for MessageCatalog {
    fn lookup(&self, key: &str) -> Option<String> {
        self.messages.get(key).cloned()
    }
}

fn flatten_into(out: &mut HashMap<String, String>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(out, &path, child);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {}
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_renders_as_key() {
        let catalog = MessageCatalog::new();
        assert_eq!(catalog.translate("views.nope", &[]), "views.nope");
    }

    #[test]
    fn placeholders_are_substituted() {
        let catalog = MessageCatalog::english();
        assert_eq!(
            catalog.translate("errors.oneOf", &[("dependentField", "Password")]),
            "Must match Password"
        );
    }

    #[test]
    fn nested_json_is_flattened() {
        let catalog = MessageCatalog::from_json_str(
            r#"{"views": {"app": {"wiki": {"created": "Wiki {name} ready"}}}, "count": 3}"#,
        )
        .unwrap();
        assert_eq!(
            catalog.translate("views.app.wiki.created", &[("name", "Home")]),
            "Wiki Home ready"
        );
        assert_eq!(catalog.lookup("count").as_deref(), Some("3"));
    }

    #[test]
    fn merge_overrides_builtin_messages() {
        let mut catalog = MessageCatalog::english();
        catalog.merge(MessageCatalog::from_json_str(r#"{"errors": {"required": "Obligatoire"}}"#).unwrap());
        assert_eq!(catalog.translate("errors.required", &[]), "Obligatoire");
        assert_eq!(catalog.translate("errors.email", &[]), "Please enter a valid email address");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(MessageCatalog::from_json_str("{not json").is_err());
    }
}
