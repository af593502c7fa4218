//! Serializable form metadata.
//!
//! Descriptors are loaded once (from JSON or TOML) and never mutated; the
//! builder compiles them into validator chains.

use crate::errors::SchemaError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// All sections of one form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormMetadata {
    #[serde(default)]
    pub sections: Vec<SectionDescriptor>,
}

impl FormMetadata {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse form metadata JSON")
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse form metadata TOML")
    }

    /// Load metadata from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read form metadata: {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
        .with_context(|| format!("Invalid form metadata in {}", path.display()))
    }

    pub fn section(&self, name: &str) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// A named group of fields validated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub validations: Validations,
}

impl FieldDescriptor {
    /// Rules of the default validation set, in declaration order.
    pub fn rules(&self) -> &[RuleDescriptor] {
        self.validations
            .default
            .as_ref()
            .map_or(&[], |set| set.rules.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Validations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ValidationSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSet {
    #[serde(rename = "type", default = "default_value_type")]
    pub value_type: String,
    #[serde(default)]
    pub rules: Vec<RuleDescriptor>,
}

fn default_value_type() -> String {
    "string".to_string()
}

/// One validation rule as declared in metadata.
///
/// On the wire a rule is `{ "name": ..., "value": ... }`:
/// - `required`, `email`: no value
/// - `oneOf`: the referenced field, as a string or a one-element array
/// - `test`: `[testName, messageKey, predicateKey]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum RuleDescriptor {
    Required,
    Email,
    OneOf {
        reference: String,
    },
    Test {
        name: String,
        message: String,
        predicate: String,
    },
}

impl RuleDescriptor {
    pub fn name(&self) -> &'static str {
        match self {
            RuleDescriptor::Required => "required",
            RuleDescriptor::Email => "email",
            RuleDescriptor::OneOf { .. } => "oneOf",
            RuleDescriptor::Test { .. } => "test",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRule {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl TryFrom<RawRule> for RuleDescriptor {
    type Error = SchemaError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let invalid = |message: &str| SchemaError::InvalidRule {
            rule: raw.name.clone(),
            message: message.to_string(),
        };

        match raw.name.as_str() {
            "required" => Ok(RuleDescriptor::Required),
            "email" => Ok(RuleDescriptor::Email),
            "oneOf" => {
                let reference = match &raw.value {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Array(items)) if items.len() == 1 => {
                        items[0].as_str().map(str::to_string)
                    }
                    _ => None,
                };
                match reference {
                    Some(reference) if !reference.is_empty() => {
                        Ok(RuleDescriptor::OneOf { reference })
                    }
                    _ => Err(invalid("expected the referenced field name")),
                }
            }
            "test" => {
                let parts: Option<Vec<String>> = match &raw.value {
                    Some(Value::Array(items)) if items.len() == 3 => items
                        .iter()
                        .map(|v| v.as_str().map(str::to_string))
                        .collect(),
                    _ => None,
                };
                match parts.as_deref() {
                    Some([name, message, predicate]) => Ok(RuleDescriptor::Test {
                        name: name.clone(),
                        message: message.clone(),
                        predicate: predicate.clone(),
                    }),
                    _ => Err(invalid("expected [testName, messageKey, predicateKey]")),
                }
            }
            _ => Err(invalid("unknown rule name")),
        }
    }
}

impl From<RuleDescriptor> for RawRule {
    fn from(rule: RuleDescriptor) -> Self {
        let name = rule.name().to_string();
        let value = match rule {
            RuleDescriptor::Required | RuleDescriptor::Email => None,
            RuleDescriptor::OneOf { reference } => Some(Value::Array(vec![reference.into()])),
            RuleDescriptor::Test {
                name,
                message,
                predicate,
            } => Some(Value::Array(vec![
                name.into(),
                message.into(),
                predicate.into(),
            ])),
        };
        RawRule { name, value }
    }
}
