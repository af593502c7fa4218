//! Field validator.
//!
//! Runs compiled chains against a model. Failures are typed [`FieldError`]s;
//! translation into display text happens only when a message is rendered.

use crate::i18n::Translator;
use crate::schema::builder::{CompiledRule, CompiledSection, FieldChain};
use crate::store::Record;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidateOptions {
    /// Stop at the first failing rule instead of collecting every failure.
    pub abort_early: bool,
}

impl ValidateOptions {
    pub fn collect_all() -> Self {
        Self { abort_early: false }
    }

    pub fn abort_early() -> Self {
        Self { abort_early: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Required,
    Email,
    OneOf,
    Test { name: String },
}

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{section}.{field} failed {kind:?} ({message_key})")]
pub struct FieldError {
    pub section: String,
    pub field: String,
    pub kind: RuleKind,
    /// Translation key of the message shown for this failure.
    pub message_key: String,
    /// Field compared against, for `oneOf`.
    pub reference: Option<String>,
}

impl FieldError {
    /// `section.field`, the key used by message state.
    pub fn path(&self) -> String {
        format!("{}.{}", self.section, self.field)
    }

    pub fn message(&self, translator: &dyn Translator) -> String {
        match &self.reference {
            Some(reference) => {
                translator.translate(&self.message_key, &[("dependentField", reference.as_str())])
            }
            None => translator.translate(&self.message_key, &[]),
        }
    }
}

/// All failures from validating one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSet {
    section: String,
    errors: Vec<FieldError>,
}

impl ErrorSet {
    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First failure recorded for `field`.
    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// Failing field names in the order they were validated.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for error in &self.errors {
            if !fields.contains(&error.field.as_str()) {
                fields.push(&error.field);
            }
        }
        fields
    }

    /// `section.field -> message`, one entry per failing field (first failure wins).
    pub fn messages(&self, translator: &dyn Translator) -> BTreeMap<String, String> {
        let mut messages = BTreeMap::new();
        for error in &self.errors {
            messages
                .entry(error.path())
                .or_insert_with(|| error.message(translator));
        }
        messages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Option<ErrorSet>,
}

impl ValidationResult {
    fn from_errors(section: &str, errors: Vec<FieldError>) -> Self {
        if errors.is_empty() {
            Self {
                is_valid: true,
                errors: None,
            }
        } else {
            Self {
                is_valid: false,
                errors: Some(ErrorSet {
                    section: section.to_string(),
                    errors,
                }),
            }
        }
    }
}

/// Validate one field; returns its first failure.
///
/// Fields not declared in the section pass.
pub fn validate_field(section: &CompiledSection, field: &str, model: &Record) -> Result<(), FieldError> {
    let Some(chain) = section.field(field) else {
        tracing::trace!(section = section.name(), field, "field not in schema; skipping");
        return Ok(());
    };
    match run_chain(section.name(), chain, model, true).into_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Validate every field of a section.
pub fn validate_all(section: &CompiledSection, model: &Record, options: ValidateOptions) -> ValidationResult {
    let mut errors = Vec::new();
    for chain in section.fields() {
        errors.extend(run_chain(section.name(), chain, model, options.abort_early));
        if options.abort_early && !errors.is_empty() {
            break;
        }
    }
    tracing::debug!(
        section = section.name(),
        failures = errors.len(),
        "validated section"
    );
    ValidationResult::from_errors(section.name(), errors)
}

fn run_chain(section: &str, chain: &FieldChain, model: &Record, abort_early: bool) -> Vec<FieldError> {
    let value = model.get(chain.name()).unwrap_or(&Value::Null);
    let mut errors = Vec::new();

    for rule in chain.rules() {
        if let Some((kind, message_key, reference)) = check_rule(rule, value, model) {
            errors.push(FieldError {
                section: section.to_string(),
                field: chain.name().to_string(),
                kind,
                message_key,
                reference,
            });
            if abort_early {
                break;
            }
        }
    }
    errors
}

fn check_rule(
    rule: &CompiledRule,
    value: &Value,
    model: &Record,
) -> Option<(RuleKind, String, Option<String>)> {
    match rule {
        CompiledRule::Required if is_blank(value) => {
            Some((RuleKind::Required, "errors.required".into(), None))
        }
        CompiledRule::Email if !is_blank(value) && !is_email(value) => {
            Some((RuleKind::Email, "errors.email".into(), None))
        }
        CompiledRule::OneOf { reference } if !is_blank(value) => {
            let other = model.get(reference).unwrap_or(&Value::Null);
            (value != other).then(|| (RuleKind::OneOf, "errors.oneOf".into(), Some(reference.clone())))
        }
        CompiledRule::Test {
            name,
            message,
            predicate,
        } if !predicate(value, model) => Some((
            RuleKind::Test { name: name.clone() },
            message.clone(),
            None,
        )),
        _ => None,
    }
}

/// Absent, null, whitespace-only strings and empty arrays count as blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_email(value: &Value) -> bool {
    value.as_str().is_some_and(|s| EMAIL_RE.is_match(s.trim()))
}
