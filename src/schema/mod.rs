//! Metadata-driven form schemas.
//!
//! A form declares its sections and per-field rules as data
//! ([`FormMetadata`]). The [`SchemaBuilder`] compiles that data once into a
//! [`CompiledSchema`]; the [`validator`] runs the compiled chains against a
//! model.
//!
//! ```text
//! FormMetadata --SchemaBuilder::compile--> CompiledSchema
//!                                               |
//!                       validate_field / validate_all(model)
//!                                               v
//!                                       ValidationResult
//! ```

pub mod builder;
pub mod descriptor;
pub mod predicates;
pub mod validator;

pub use builder::{CompiledRule, CompiledSchema, CompiledSection, FieldChain, SchemaBuilder};
pub use descriptor::{
    FieldDescriptor, FormMetadata, RuleDescriptor, SectionDescriptor, ValidationSet, Validations,
};
pub use predicates::{Predicate, PredicateRegistry, date_after, parse_date};
pub use validator::{
    ErrorSet, FieldError, RuleKind, ValidateOptions, ValidationResult, validate_all,
    validate_field,
};
