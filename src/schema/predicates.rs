//! Named predicates for `test` rules.
//!
//! Metadata cannot carry code, so a `test` rule names its predicate by key.
//! Keys resolve against explicit registrations first, then the built-in
//! parameterized families:
//!
//! | Key                 | Passes when                                        |
//! |---------------------|----------------------------------------------------|
//! | `dateAfter:<field>` | the value is a date strictly after `<field>`'s date |

use crate::store::Record;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A test predicate: `(value, owning model) -> passes`.
pub type Predicate = Arc<dyn Fn(&Value, &Record) -> bool + Send + Sync>;

const DATE_AFTER_PREFIX: &str = "dateAfter:";

#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, Predicate>,
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.predicates.keys().collect();
        names.sort();
        f.debug_struct("PredicateRegistry")
            .field("predicates", &names)
            .finish()
    }
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, key: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Record) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(key.into(), Arc::new(predicate));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, key: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Record) -> bool + Send + Sync + 'static,
    {
        self.register(key, predicate);
        self
    }

    pub fn resolve(&self, key: &str) -> Option<Predicate> {
        if let Some(predicate) = self.predicates.get(key) {
            return Some(predicate.clone());
        }
        if let Some(field) = key.strip_prefix(DATE_AFTER_PREFIX)
            && !field.is_empty()
        {
            return Some(date_after(field));
        }
        None
    }
}

/// Predicate passing when the value's date is strictly after `field`'s date.
///
/// Either side failing to parse makes the predicate fail.
pub fn date_after(field: &str) -> Predicate {
    let field = field.to_string();
    Arc::new(move |value: &Value, model: &Record| {
        match (parse_date(value), model.get(&field).and_then(parse_date)) {
            (Some(end), Some(start)) => end > start,
            _ => false,
        }
    })
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}
