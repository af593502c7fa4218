use super::{display_attr, required, section};
use crate::form::{FormContext, FormPolicy};
use crate::i18n::Translator;
use crate::router::Transition;
use crate::schema::FormMetadata;
use crate::store::{ChangedAttributes, Record, Store};
use async_trait::async_trait;

pub const SECTION: &str = "wikiCreate";

pub fn metadata() -> FormMetadata {
    FormMetadata {
        sections: vec![section(
            SECTION,
            vec![required("name"), required("projectId"), required("markUp")],
        )],
    }
}

fn with_project(transition: Transition, ctx: &FormContext) -> Transition {
    match &ctx.project {
        Some(project) => transition.with_param("project_id", project.short_code.as_str()),
        None => transition,
    }
}

/// Create a wiki page in the tracked project.
#[derive(Debug, Clone, Copy, Default)]
pub struct WikiCreatePolicy;

#[async_trait]
impl FormPolicy for WikiCreatePolicy {
    /// Pages always belong to the tracked project.
    fn before_validate(&self, model: &mut Record, ctx: &FormContext) {
        if model.get("projectId").is_none()
            && let Some(project) = &ctx.project
        {
            model.set("projectId", project.id.as_str());
        }
    }

    fn success_message(&self, saved: &Record, translator: &dyn Translator) -> String {
        translator.translate("views.app.wiki.created", &[("name", display_attr(saved, "name").as_str())])
    }

    fn navigate_to_success(&self, saved: &Record, ctx: &FormContext) -> Option<Transition> {
        let page = Transition::new("app.project.wiki.page").with_param("wiki_name", display_attr(saved, "name"));
        Some(with_project(page, ctx))
    }

    fn has_changed(&self, changed: &ChangedAttributes) -> bool {
        changed.keys().any(|name| name != "projectId")
    }

    fn after_cancel(&self, _model: &mut Record, _store: &dyn Store, ctx: &FormContext) -> Option<Transition> {
        Some(with_project(Transition::new("app.project.wiki"), ctx))
    }
}
