//! The tracker's concrete forms.
//!
//! Each form contributes its metadata and a [`FormPolicy`](crate::form::FormPolicy);
//! the generic controller does the rest.

pub mod issue;
pub mod project;
pub mod reset_password;
pub mod wiki;

pub use issue::{IssueCreatePolicy, IssueEditPolicy};
pub use project::{ProjectCreatePolicy, short_code};
pub use reset_password::{ResetPasswordPolicy, ResetPasswordStore};
pub use wiki::WikiCreatePolicy;

use crate::schema::{
    FieldDescriptor, FormMetadata, PredicateRegistry, RuleDescriptor, SectionDescriptor,
    ValidationSet, Validations, parse_date,
};
use crate::store::Record;
use clap::ValueEnum;
use serde_json::Value;

/// Forms known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormKind {
    Project,
    Issue,
    Wiki,
    ResetPassword,
}

impl FormKind {
    pub const ALL: [FormKind; 4] = [
        FormKind::Project,
        FormKind::Issue,
        FormKind::Wiki,
        FormKind::ResetPassword,
    ];

    /// Module name used for labels and messages.
    pub fn module(&self) -> &'static str {
        match self {
            FormKind::Project => "project",
            FormKind::Issue => "issue",
            FormKind::Wiki => "wiki",
            FormKind::ResetPassword => "user",
        }
    }

    /// Section validated on save.
    pub fn section(&self) -> &'static str {
        match self {
            FormKind::Project => project::SECTION,
            FormKind::Issue => issue::SECTION,
            FormKind::Wiki => wiki::SECTION,
            FormKind::ResetPassword => reset_password::SECTION,
        }
    }

    /// Model of the record the form edits.
    pub fn model(&self) -> &'static str {
        match self {
            FormKind::Project => "project",
            FormKind::Issue => "issue",
            FormKind::Wiki => "wiki",
            FormKind::ResetPassword => reset_password::MODEL,
        }
    }

    pub fn metadata(&self) -> FormMetadata {
        match self {
            FormKind::Project => project::metadata(),
            FormKind::Issue => issue::metadata(),
            FormKind::Wiki => wiki::metadata(),
            FormKind::ResetPassword => reset_password::metadata(),
        }
    }

    /// Predicates the form's `test` rules need beyond the built-in families.
    pub fn predicates(&self) -> PredicateRegistry {
        PredicateRegistry::new()
    }
}

pub(crate) fn section(name: &str, fields: Vec<FieldDescriptor>) -> SectionDescriptor {
    SectionDescriptor {
        name: name.to_string(),
        fields,
    }
}

pub(crate) fn field(name: &str, rules: Vec<RuleDescriptor>) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        validations: Validations {
            default: Some(ValidationSet {
                value_type: "string".to_string(),
                rules,
            }),
        },
    }
}

pub(crate) fn required(name: &str) -> FieldDescriptor {
    field(name, vec![RuleDescriptor::Required])
}

/// Rewrite a date attribute as `YYYY-MM-DD`. Unparseable values are left alone.
pub(crate) fn normalize_date(model: &mut Record, name: &str) {
    if let Some(date) = model.get(name).and_then(parse_date) {
        model.set(name, Value::String(date.format("%Y-%m-%d").to_string()));
    }
}

/// String form of an attribute for messages and route params.
pub(crate) fn display_attr(model: &Record, name: &str) -> String {
    match model.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
