use crate::errors::StoreError;
use crate::i18n::Translator;
use crate::router::Transition;
use crate::store::{ChangedAttributes, Record, Store};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The project the user is currently working in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProject {
    pub id: String,
    #[serde(rename = "shortCode")]
    pub short_code: String,
    pub name: String,
}

/// Everything a form needs to know about where it is used.
#[derive(Debug, Clone, Default)]
pub struct FormContext {
    /// Module name used for labels and messages (`project`, `issue`, ...).
    pub module: String,
    pub project: Option<TrackedProject>,
}

impl FormContext {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            project: None,
        }
    }

    pub fn with_project(mut self, project: TrackedProject) -> Self {
        self.project = Some(project);
        self
    }

    /// Translation key of a field label: `views.app.<module>.fields.<field>`.
    pub fn label_key(&self, field: &str) -> String {
        format!("views.app.{}.fields.{}", self.module, field)
    }
}

/// Per-form behavior plugged into the generic controller.
///
/// Every hook has a no-op default, so a form only overrides what it needs.
#[async_trait]
pub trait FormPolicy: Send + Sync {
    /// Normalize the model before any validation runs.
    fn before_validate(&self, _model: &mut Record, _ctx: &FormContext) {}

    /// Last changes to a valid model before it is persisted.
    fn before_save(&self, _model: &mut Record, _ctx: &FormContext) {}

    /// Runs after a successful save and before the success notification.
    async fn after_save(
        &self,
        _saved: &Record,
        _store: &dyn Store,
        _ctx: &FormContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn success_message(&self, _saved: &Record, _translator: &dyn Translator) -> String {
        String::new()
    }

    fn navigate_to_success(&self, _saved: &Record, _ctx: &FormContext) -> Option<Transition> {
        None
    }

    /// Text of the error notification posted when persistence fails.
    fn failure_message(&self, error: &StoreError, translator: &dyn Translator) -> String {
        translator.translate("global.form.savefailed", &[("reason", error.to_string().as_str())])
    }

    /// Whether cancelling would discard user edits.
    fn has_changed(&self, changed: &ChangedAttributes) -> bool {
        !changed.is_empty()
    }

    /// Runs once the user has agreed to leave the form.
    fn after_cancel(
        &self,
        _model: &mut Record,
        _store: &dyn Store,
        _ctx: &FormContext,
    ) -> Option<Transition> {
        None
    }
}

/// A policy that keeps every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl FormPolicy for DefaultPolicy {}
