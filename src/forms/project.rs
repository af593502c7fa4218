use super::{display_attr, normalize_date, required, section};
use crate::form::{FormContext, FormPolicy};
use crate::i18n::Translator;
use crate::router::Transition;
use crate::schema::FormMetadata;
use crate::store::{ChangedAttributes, Record, Store};
use anyhow::Context;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Value, json};

pub const SECTION: &str = "projectCreate";

/// Attributes the form fills in itself; they are not user edits.
const STAMPED: &[&str] = &["shortCode", "hasIssuetypes"];

pub fn metadata() -> FormMetadata {
    FormMetadata {
        sections: vec![section(
            SECTION,
            vec![
                required("name"),
                required("shortCode"),
                required("type"),
                required("hasIssuetypes"),
            ],
        )],
    }
}

/// Project short code: the letters of `name`, first five, upper-cased.
pub fn short_code(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphabetic)
        .take(5)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Create a project together with the issue types picked for it.
#[derive(Debug, Clone, Default)]
pub struct ProjectCreatePolicy {
    issue_types: Vec<String>,
}

impl ProjectCreatePolicy {
    pub fn new(issue_types: Vec<String>) -> Self {
        Self { issue_types }
    }

    pub fn issue_types(&self) -> &[String] {
        &self.issue_types
    }
}

#[async_trait]
impl FormPolicy for ProjectCreatePolicy {
    fn before_validate(&self, model: &mut Record, _ctx: &FormContext) {
        let code = short_code(model.get_str("name").unwrap_or_default());
        model.set("shortCode", code);
        let has_types = if self.issue_types.is_empty() {
            Value::String(String::new())
        } else {
            Value::Bool(true)
        };
        model.set("hasIssuetypes", has_types);
    }

    fn before_save(&self, model: &mut Record, _ctx: &FormContext) {
        model.set("deleted", "0");
        normalize_date(model, "startDate");
        normalize_date(model, "endDate");
    }

    async fn after_save(&self, saved: &Record, store: &dyn Store, _ctx: &FormContext) -> anyhow::Result<()> {
        let project_id = saved
            .id()
            .context("Saved project has no id")?
            .to_string();

        let saves = self.issue_types.iter().map(|name| {
            let mut issue_type = Record::new("issuetype");
            issue_type.set("name", name.as_str());
            issue_type.set("deleted", json!(0));
            issue_type.set("description", name.as_str());
            issue_type.set("system", json!(0));
            issue_type.set("projectId", project_id.as_str());
            store.save(issue_type)
        });
        let created = try_join_all(saves)
            .await
            .with_context(|| format!("Failed to create issue types for project {}", project_id))?;
        tracing::debug!(project = %project_id, issue_types = created.len(), "issue types created");
        Ok(())
    }

    fn success_message(&self, saved: &Record, translator: &dyn Translator) -> String {
        translator.translate("views.app.project.created", &[("name", display_attr(saved, "name").as_str())])
    }

    fn navigate_to_success(&self, saved: &Record, _ctx: &FormContext) -> Option<Transition> {
        Some(Transition::new("app.project").with_param("project_id", display_attr(saved, "shortCode")))
    }

    fn has_changed(&self, changed: &ChangedAttributes) -> bool {
        changed.keys().any(|name| !STAMPED.contains(&name.as_str()))
    }

    fn after_cancel(&self, _model: &mut Record, _store: &dyn Store, _ctx: &FormContext) -> Option<Transition> {
        Some(Transition::new("app.projects"))
    }
}
