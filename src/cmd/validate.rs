//! Offline validation of a data file against a form schema: `p4m validate`.

use anyhow::{Context, Result, bail};
use console::style;
use p4m_client::config::ClientConfig;
use p4m_client::form::FormContext;
use p4m_client::forms::FormKind;
use p4m_client::i18n::Translator;
use p4m_client::schema::{FormMetadata, PredicateRegistry, SchemaBuilder, ValidateOptions, validate_all};
use p4m_client::store::Record;
use p4m_client::ui::icons::{ERROR, SUCCESS};
use std::path::Path;

use super::{load_catalog, read_attributes};

/// Where the schema comes from.
pub enum SchemaSource<'a> {
    Builtin(FormKind),
    File { path: &'a Path, section: Option<&'a str> },
}

pub fn cmd_validate(config: &ClientConfig, source: SchemaSource<'_>, data: &Path, abort_early: bool) -> Result<()> {
    let (metadata, section, module, predicates) = match source {
        SchemaSource::Builtin(kind) => (
            kind.metadata(),
            kind.section().to_string(),
            kind.module().to_string(),
            kind.predicates(),
        ),
        SchemaSource::File { path, section } => {
            let metadata = FormMetadata::load(path)?;
            let section = match section {
                Some(name) => name.to_string(),
                None => metadata
                    .sections
                    .first()
                    .map(|s| s.name.clone())
                    .with_context(|| format!("{} declares no sections", path.display()))?,
            };
            (metadata, section, "form".to_string(), PredicateRegistry::new())
        }
    };

    let schema = SchemaBuilder::new(predicates)
        .compile_metadata(&metadata)
        .context("Form metadata does not compile")?;
    let compiled = schema
        .section(&section)
        .with_context(|| format!("Section '{}' is not declared", section))?;

    let mut record = Record::new(module.as_str());
    for (name, value) in read_attributes(data)? {
        record.set(name, value);
    }

    let options = if abort_early {
        ValidateOptions::abort_early()
    } else {
        ValidateOptions::collect_all()
    };
    let result = validate_all(compiled, &record, options);
    let Some(errors) = result.errors.filter(|_| !result.is_valid) else {
        println!("{}{} is valid", SUCCESS, style(&section).bold());
        return Ok(());
    };

    let translator = load_catalog(config)?;
    let context = FormContext::new(module);
    for error in errors.errors() {
        let label = translator
            .lookup(&context.label_key(&error.field))
            .unwrap_or_else(|| error.field.clone());
        println!("{}{}: {}", ERROR, style(label).bold(), error.message(&translator));
    }
    bail!("{} rule(s) failed in section '{}'", errors.len(), section)
}
