//! CLI command implementations.
//!
//! | Module      | Commands handled                 |
//! |-------------|----------------------------------|
//! | `validate`  | `Validate`                       |
//! | `forms`     | `Forms` (`list`, `show`, `submit`) |
//! | `signin`    | `Signin`                         |
//! | `milestone` | `Milestone`                      |
//! | `config`    | `Config`                         |

pub mod config;
pub mod forms;
pub mod milestone;
pub mod signin;
pub mod validate;

pub use config::cmd_config;
pub use forms::{SubmitOptions, cmd_forms_list, cmd_forms_show, cmd_submit};
pub use milestone::cmd_milestone;
pub use signin::cmd_signin;
pub use validate::cmd_validate;

use anyhow::{Context, Result, bail};
use p4m_client::config::ClientConfig;
use p4m_client::guard::{AccessGuard, RouteAcl};
use p4m_client::i18n::MessageCatalog;
use p4m_client::router::{AppRouter, Transition};
use p4m_client::store::Attributes;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// English messages, overlaid with the configured catalog if there is one.
pub(crate) fn load_catalog(config: &ClientConfig) -> Result<MessageCatalog> {
    let mut catalog = MessageCatalog::english();
    if let Some(path) = config.catalog_path() {
        catalog.merge(MessageCatalog::load(&path)?);
    }
    Ok(catalog)
}

/// Router with the access guard installed from the `[routes]` settings.
pub(crate) fn guarded_router(config: &ClientConfig) -> Arc<AppRouter> {
    let router = Arc::new(AppRouter::new());
    let routes = config.routes();
    let guard = AccessGuard::new(Arc::new(RouteAcl::from_config(routes)), routes.access_denied.as_str());
    guard.register(router.as_ref());
    router
}

/// Read record attributes from a JSON or TOML file holding a single table.
pub(crate) fn read_attributes(path: &Path) -> Result<Attributes> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;
    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            let table: toml::Table = toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML data: {}", path.display()))?;
            serde_json::to_value(table).context("Failed to convert TOML data")?
        }
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON data: {}", path.display()))?,
    };
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => bail!(
            "Data file {} must hold an object, found {}",
            path.display(),
            kind_of(&other)
        ),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One-line description of a route transition.
pub(crate) fn describe(transition: &Transition) -> String {
    if transition.params.is_empty() {
        return transition.to.clone();
    }
    let params: Vec<String> = transition
        .params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    format!("{} ({})", transition.to, params.join(", "))
}
