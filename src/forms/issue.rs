use super::{display_attr, field, normalize_date, required, section};
use crate::form::{FormContext, FormPolicy};
use crate::i18n::Translator;
use crate::router::Transition;
use crate::schema::{FormMetadata, RuleDescriptor};
use crate::store::{ChangedAttributes, Record, Store};
use async_trait::async_trait;

pub const SECTION: &str = "issueCreate";

const END_DATE_MESSAGE: &str = "views.app.issue.create.validations.endDateGreaterThanStartDate";

/// Attributes that change without the user touching the form.
const STAMPED: &[&str] = &["statusId", "reportedUser"];

pub fn metadata() -> FormMetadata {
    FormMetadata {
        sections: vec![section(
            SECTION,
            vec![
                required("subject"),
                required("typeId"),
                required("assignee"),
                required("owner"),
                required("statusId"),
                required("priority"),
                required("startDate"),
                field(
                    "endDate",
                    vec![
                        RuleDescriptor::Required,
                        RuleDescriptor::Test {
                            name: "end-date-greater-than-start-date".to_string(),
                            message: END_DATE_MESSAGE.to_string(),
                            predicate: "dateAfter:startDate".to_string(),
                        },
                    ],
                ),
            ],
        )],
    }
}

fn issue_page(saved: &Record, ctx: &FormContext) -> Transition {
    let transition =
        Transition::new("app.project.issue.page").with_param("issue_number", display_attr(saved, "issueNumber"));
    match &ctx.project {
        Some(project) => transition.with_param("project_id", project.short_code.as_str()),
        None => transition,
    }
}

fn issue_list(ctx: &FormContext) -> Transition {
    let transition = Transition::new("app.project.issue");
    match &ctx.project {
        Some(project) => transition.with_param("project_id", project.short_code.as_str()),
        None => transition,
    }
}

fn issue_args(saved: &Record) -> [(String, String); 2] {
    [
        ("name".to_string(), display_attr(saved, "subject")),
        ("issueNumber".to_string(), display_attr(saved, "issueNumber")),
    ]
}

fn translate_issue(translator: &dyn Translator, key: &str, saved: &Record) -> String {
    let args = issue_args(saved);
    let args: Vec<(&str, &str)> = args.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    translator.translate(key, &args)
}

/// Create an issue in the tracked project.
#[derive(Debug, Clone)]
pub struct IssueCreatePolicy {
    reporter: String,
}

impl IssueCreatePolicy {
    /// `reporter` is the id of the signed-in user.
    pub fn new(reporter: impl Into<String>) -> Self {
        Self {
            reporter: reporter.into(),
        }
    }
}

#[async_trait]
impl FormPolicy for IssueCreatePolicy {
    fn before_save(&self, model: &mut Record, _ctx: &FormContext) {
        model.set("reportedUser", self.reporter.as_str());
        normalize_date(model, "startDate");
        normalize_date(model, "endDate");
    }

    fn success_message(&self, saved: &Record, translator: &dyn Translator) -> String {
        translate_issue(translator, "views.app.issue.created", saved)
    }

    fn navigate_to_success(&self, saved: &Record, ctx: &FormContext) -> Option<Transition> {
        Some(issue_page(saved, ctx))
    }

    fn has_changed(&self, changed: &ChangedAttributes) -> bool {
        changed.keys().any(|name| !STAMPED.contains(&name.as_str()))
    }

    fn after_cancel(&self, _model: &mut Record, _store: &dyn Store, ctx: &FormContext) -> Option<Transition> {
        Some(issue_list(ctx))
    }
}

/// Edit an existing issue. Cancelling discards the edits.
#[derive(Debug, Clone)]
pub struct IssueEditPolicy {
    create: IssueCreatePolicy,
}

impl IssueEditPolicy {
    pub fn new(reporter: impl Into<String>) -> Self {
        Self {
            create: IssueCreatePolicy::new(reporter),
        }
    }
}

#[async_trait]
impl FormPolicy for IssueEditPolicy {
    fn before_save(&self, model: &mut Record, ctx: &FormContext) {
        self.create.before_save(model, ctx);
    }

    fn success_message(&self, saved: &Record, translator: &dyn Translator) -> String {
        translate_issue(translator, "views.app.issue.updated", saved)
    }

    fn navigate_to_success(&self, saved: &Record, ctx: &FormContext) -> Option<Transition> {
        Some(issue_page(saved, ctx))
    }

    fn has_changed(&self, changed: &ChangedAttributes) -> bool {
        self.create.has_changed(changed)
    }

    fn after_cancel(&self, model: &mut Record, store: &dyn Store, ctx: &FormContext) -> Option<Transition> {
        let transition = issue_page(model, ctx);
        store.rollback(model);
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{CancelOutcome, Collaborators, FormController, SaveOutcome, TrackedProject};
    use crate::i18n::MessageCatalog;
    use crate::notify::{PromptChoice, RecordingNotifier};
    use crate::router::AppRouter;
    use crate::schema::{PredicateRegistry, RuleKind};
    use crate::store::{Attributes, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    fn context() -> FormContext {
        FormContext::new("issue").with_project(TrackedProject {
            id: "3".into(),
            short_code: "APOLL".into(),
            name: "Apollo".into(),
        })
    }

    fn controller<P: FormPolicy>(policy: P, notifier: &RecordingNotifier, model: Record) -> FormController<P> {
        FormController::compile(
            &metadata(),
            PredicateRegistry::new(),
            policy,
            context(),
            Collaborators {
                store: Arc::new(MemoryStore::new()),
                notifier: Arc::new(notifier.clone()),
                translator: Arc::new(MessageCatalog::english()),
                router: Arc::new(AppRouter::new()),
            },
            model,
        )
        .unwrap()
    }

    fn fill(form: &FormController<impl FormPolicy>, end: &str) {
        for (name, value) in [
            ("subject", "Broken build"),
            ("typeId", "1"),
            ("assignee", "7"),
            ("owner", "7"),
            ("statusId", "2"),
            ("priority", "high"),
            ("startDate", "2024-05-01"),
        ] {
            form.set(name, value);
        }
        form.set("endDate", end);
        form.set("issueNumber", json!(17));
    }

    #[tokio::test]
    async fn end_date_must_follow_start_date() {
        let notifier = RecordingNotifier::new();
        let form = controller(IssueCreatePolicy::new("9"), &notifier, Record::new("issue"));
        fill(&form, "2024-05-01");

        let SaveOutcome::Invalid(errors) = form.save(SECTION).await.unwrap() else {
            panic!("same-day end date must be rejected");
        };
        let error = errors.for_field("endDate").unwrap();
        assert_eq!(
            error.kind,
            RuleKind::Test {
                name: "end-date-greater-than-start-date".into()
            }
        );
        assert_eq!(
            form.messages().get(SECTION, "endDate").as_deref(),
            Some("End date must be later than the start date")
        );
    }

    #[tokio::test]
    async fn missing_end_date_is_reported_on_one_line() {
        let notifier = RecordingNotifier::new();
        let form = controller(IssueCreatePolicy::new("9"), &notifier, Record::new("issue"));
        fill(&form, "");
        form.update_model(|model| {
            model.remove("endDate");
        });

        let SaveOutcome::Invalid(errors) = form.save(SECTION).await.unwrap() else {
            panic!("an issue without an end date must be rejected");
        };
        assert_eq!(errors.fields(), vec!["endDate"]);
        assert_eq!(errors.len(), 2);

        let posted = notifier.posted();
        assert_eq!(posted.len(), 1);
        let lines: Vec<&str> = posted[0].message.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("This field is required"));
    }

    #[tokio::test]
    async fn save_stamps_reporter_and_opens_the_issue() {
        let notifier = RecordingNotifier::new();
        let form = controller(IssueCreatePolicy::new("9"), &notifier, Record::new("issue"));
        fill(&form, "2024-05-20T12:00:00Z");

        let SaveOutcome::Saved { record, navigated } = form.save(SECTION).await.unwrap() else {
            panic!("expected the issue to be saved");
        };
        assert_eq!(record.get_str("reportedUser"), Some("9"));
        assert_eq!(record.get_str("endDate"), Some("2024-05-20"));
        assert_eq!(
            navigated,
            Some(
                Transition::new("app.project.issue.page")
                    .with_param("issue_number", "17")
                    .with_param("project_id", "APOLL")
            )
        );
        assert_eq!(
            notifier.posted().last().unwrap().message,
            "Issue #17 Broken build has been created"
        );
    }

    #[tokio::test]
    async fn edit_cancel_rolls_back_and_returns_to_the_issue() {
        let notifier = RecordingNotifier::new();
        let mut attrs = Attributes::new();
        attrs.insert("subject".into(), json!("Broken build"));
        attrs.insert("issueNumber".into(), json!(17));
        let form = controller(
            IssueEditPolicy::new("9"),
            &notifier,
            Record::loaded("issue", "5", attrs),
        );
        form.set("subject", "Still broken");
        notifier.answer_next(Some(PromptChoice::Confirm));

        let outcome = form.cancel().await;
        assert_eq!(
            outcome,
            CancelOutcome::Cancelled {
                navigated: Some(
                    Transition::new("app.project.issue.page")
                        .with_param("issue_number", "17")
                        .with_param("project_id", "APOLL")
                )
            }
        );
        assert_eq!(form.model().get_str("subject"), Some("Broken build"));
    }

    #[test]
    fn status_and_reporter_changes_do_not_count() {
        let policy = IssueCreatePolicy::new("9");
        let mut model = Record::new("issue");
        model.set("statusId", "1");
        model.set("reportedUser", "9");
        assert!(!policy.has_changed(&model.changed_attributes()));
        model.set("subject", "x");
        assert!(policy.has_changed(&model.changed_attributes()));
    }
}
