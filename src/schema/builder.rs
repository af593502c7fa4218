//! Schema builder: compiles section descriptors into validator chains.

use crate::errors::SchemaError;
use crate::schema::descriptor::{FormMetadata, RuleDescriptor, SectionDescriptor};
use crate::schema::predicates::{Predicate, PredicateRegistry};
use std::collections::HashSet;
use std::fmt;

/// A rule ready to run against a model.
#[derive(Clone)]
pub enum CompiledRule {
    Required,
    Email,
    OneOf {
        reference: String,
    },
    Test {
        name: String,
        message: String,
        predicate: Predicate,
    },
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledRule::Required => f.write_str("Required"),
            CompiledRule::Email => f.write_str("Email"),
            CompiledRule::OneOf { reference } => {
                f.debug_struct("OneOf").field("reference", reference).finish()
            }
            CompiledRule::Test { name, message, .. } => f
                .debug_struct("Test")
                .field("name", name)
                .field("message", message)
                .finish_non_exhaustive(),
        }
    }
}

/// Ordered rules for one field.
#[derive(Debug, Clone)]
pub struct FieldChain {
    pub(crate) name: String,
    pub(crate) rules: Vec<CompiledRule>,
}

impl FieldChain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// The field this chain compares against through `oneOf`, if any.
    pub fn reference(&self) -> Option<&str> {
        self.rules.iter().find_map(|rule| match rule {
            CompiledRule::OneOf { reference } => Some(reference.as_str()),
            _ => None,
        })
    }
}

/// Validator chains of one section, in declaration order.
#[derive(Debug, Clone)]
pub struct CompiledSection {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldChain>,
}

impl CompiledSection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldChain] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldChain> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.field(field).is_some()
    }
}

/// Every compiled section of a form.
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    sections: Vec<CompiledSection>,
}

impl CompiledSchema {
    pub fn section(&self, name: &str) -> Option<&CompiledSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections(&self) -> &[CompiledSection] {
        &self.sections
    }

    /// Whether `section.field` is declared in this schema.
    pub fn declares(&self, section: &str, field: &str) -> bool {
        self.section(section).is_some_and(|s| s.contains(field))
    }
}

/// Compiles descriptors against a predicate registry.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    predicates: PredicateRegistry,
}

impl SchemaBuilder {
    pub fn new(predicates: PredicateRegistry) -> Self {
        Self { predicates }
    }

    pub fn compile(&self, sections: &[SectionDescriptor]) -> Result<CompiledSchema, SchemaError> {
        let sections = sections
            .iter()
            .map(|section| self.compile_section(section))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(sections = sections.len(), "compiled form schema");
        Ok(CompiledSchema { sections })
    }

    pub fn compile_metadata(&self, metadata: &FormMetadata) -> Result<CompiledSchema, SchemaError> {
        self.compile(&metadata.sections)
    }

    fn compile_section(&self, section: &SectionDescriptor) -> Result<CompiledSection, SchemaError> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(section.fields.len());

        for field in &section.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    section: section.name.clone(),
                    field: field.name.clone(),
                });
            }

            let mut rules = Vec::with_capacity(field.rules().len());
            for rule in field.rules() {
                let compiled = match rule {
                    RuleDescriptor::Required => CompiledRule::Required,
                    RuleDescriptor::Email => CompiledRule::Email,
                    RuleDescriptor::OneOf { reference } => CompiledRule::OneOf {
                        reference: reference.clone(),
                    },
                    RuleDescriptor::Test {
                        name,
                        message,
                        predicate,
                    } => {
                        let resolved = self.predicates.resolve(predicate).ok_or_else(|| {
                            SchemaError::UnknownPredicate {
                                section: section.name.clone(),
                                field: field.name.clone(),
                                predicate: predicate.clone(),
                            }
                        })?;
                        CompiledRule::Test {
                            name: name.clone(),
                            message: message.clone(),
                            predicate: resolved,
                        }
                    }
                };
                rules.push(compiled);
            }

            fields.push(FieldChain {
                name: field.name.clone(),
                rules,
            });
        }

        Ok(CompiledSection {
            name: section.name.clone(),
            fields,
        })
    }
}
