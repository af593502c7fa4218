//! Generic form lifecycle: validate, persist, notify, navigate.
//!
//! ```text
//! Idle -> Validating -> Invalid -> Idle
//!                    -> Valid -> Saving -> Saved -> Idle
//!                                       -> SaveFailed -> Idle
//! ```
//!
//! A save runs strictly in order: `before_validate`, validation,
//! `before_save`, persistence, `after_save`, success notification,
//! navigation. A second `save` while one is running is rejected.

use crate::errors::{FormError, StoreError};
use crate::form::destroy::{DestroyOutcome, destroy_with_confirmation};
use crate::form::messages::{MessageState, Messages};
use crate::form::policy::{FormContext, FormPolicy};
use crate::i18n::Translator;
use crate::notify::{Notification, Notifier, PromptChoice};
use crate::router::{Router, Transition};
use crate::schema::{
    CompiledSchema, ErrorSet, FieldError, FormMetadata, PredicateRegistry, SchemaBuilder,
    ValidateOptions, validator,
};
use crate::store::{Record, Store};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Validating,
    Invalid,
    Valid,
    Saving,
    Saved,
    SaveFailed,
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormState::Idle => "idle",
            FormState::Validating => "validating",
            FormState::Invalid => "invalid",
            FormState::Valid => "valid",
            FormState::Saving => "saving",
            FormState::Saved => "saved",
            FormState::SaveFailed => "save-failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum SaveOutcome {
    /// Validation failed; nothing was persisted.
    Invalid(ErrorSet),
    /// The record was persisted; `navigated` is the route entered afterwards.
    Saved {
        record: Record,
        navigated: Option<Transition>,
    },
}

#[derive(Debug, PartialEq)]
pub enum CancelOutcome {
    /// The user chose to stay on the form.
    Kept,
    Cancelled { navigated: Option<Transition> },
}

/// Services a form talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub translator: Arc<dyn Translator>,
    pub router: Arc<dyn Router>,
}

pub struct FormController<P: FormPolicy> {
    schema: CompiledSchema,
    policy: P,
    context: FormContext,
    deps: Collaborators,
    model: Mutex<Record>,
    messages: MessageState,
    state: Mutex<FormState>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the save ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: FormPolicy> FormController<P> {
    pub fn new(
        schema: CompiledSchema,
        policy: P,
        context: FormContext,
        deps: Collaborators,
        model: Record,
    ) -> Self {
        let messages = MessageState::new(&schema);
        Self {
            schema,
            policy,
            context,
            deps,
            model: Mutex::new(model),
            messages,
            state: Mutex::new(FormState::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Compile `metadata` and build a controller around it.
    pub fn compile(
        metadata: &FormMetadata,
        predicates: PredicateRegistry,
        policy: P,
        context: FormContext,
        deps: Collaborators,
        model: Record,
    ) -> Result<Self, FormError> {
        let schema = SchemaBuilder::new(predicates).compile_metadata(metadata)?;
        Ok(Self::new(schema, policy, context, deps, model))
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn context(&self) -> &FormContext {
        &self.context
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn messages(&self) -> &MessageState {
        &self.messages
    }

    pub fn state(&self) -> FormState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// A copy of the current model.
    pub fn model(&self) -> Record {
        self.lock_model().clone()
    }

    pub fn set(&self, field: &str, value: impl Into<Value>) {
        self.lock_model().set(field, value);
    }

    pub fn update_model(&self, update: impl FnOnce(&mut Record)) {
        update(&mut self.lock_model());
    }

    /// Validate `section` and persist the model when it is valid.
    ///
    /// Invalid input is not an error: it yields [`SaveOutcome::Invalid`]
    /// after the aggregated error notification has been posted.
    pub async fn save(&self, section: &str) -> Result<SaveOutcome, FormError> {
        let compiled = self
            .schema
            .section(section)
            .ok_or_else(|| FormError::UnknownSection(section.to_string()))?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(section, "save ignored: already in progress");
            return Err(FormError::SaveInProgress);
        }
        let _in_flight = InFlight(&self.in_flight);

        self.set_state(FormState::Validating);
        let result = {
            let mut model = self.lock_model();
            self.policy.before_validate(&mut model, &self.context);
            validator::validate_all(compiled, &model, ValidateOptions::collect_all())
        };

        if let Some(errors) = result.errors.filter(|_| !result.is_valid) {
            self.set_state(FormState::Invalid);
            self.report_invalid(section, &errors);
            self.set_state(FormState::Idle);
            return Ok(SaveOutcome::Invalid(errors));
        }

        self.set_state(FormState::Valid);
        self.messages.clear_section(section);
        let record = {
            let mut model = self.lock_model();
            self.policy.before_save(&mut model, &self.context);
            model.clone()
        };

        self.set_state(FormState::Saving);
        let saved = match self.deps.store.save(record).await {
            Ok(saved) => saved,
            Err(e) => {
                self.set_state(FormState::SaveFailed);
                tracing::warn!(module = %self.context.module, error = %e, "save failed");
                self.post_failure(&e);
                self.set_state(FormState::Idle);
                return Err(FormError::Persistence(e));
            }
        };
        *self.lock_model() = saved.clone();

        if let Err(e) = self
            .policy
            .after_save(&saved, self.deps.store.as_ref(), &self.context)
            .await
        {
            self.set_state(FormState::SaveFailed);
            tracing::warn!(module = %self.context.module, error = %e, "post-save step failed");
            self.deps.notifier.post(Notification::error(self.deps.translator.translate(
                "global.form.savefailed",
                &[("reason", e.to_string().as_str())],
            )));
            self.set_state(FormState::Idle);
            return Err(FormError::AfterSave(e));
        }

        self.set_state(FormState::Saved);
        tracing::info!(module = %self.context.module, id = ?saved.id(), "record saved");
        let message = self
            .policy
            .success_message(&saved, self.deps.translator.as_ref());
        if !message.is_empty() {
            self.deps.notifier.post(Notification::success(message));
        }
        let navigated = self
            .policy
            .navigate_to_success(&saved, &self.context)
            .map(|t| self.deps.router.transition_to(t));

        self.set_state(FormState::Idle);
        Ok(SaveOutcome::Saved {
            record: saved,
            navigated,
        })
    }

    /// Validate a single field as the user edits it.
    ///
    /// With a `dependent` field (e.g. a confirmation input), the dependent's
    /// message is cleared when both values match and the dependent is then
    /// re-validated; its failure is recorded against the dependent.
    pub fn validate_field(
        &self,
        section: &str,
        field: &str,
        dependent: Option<&str>,
    ) -> Result<(), FieldError> {
        let Some(compiled) = self.schema.section(section) else {
            return Ok(());
        };
        if !compiled.contains(field) {
            return Ok(());
        }

        let model = {
            let mut model = self.lock_model();
            self.policy.before_validate(&mut model, &self.context);
            model.clone()
        };
        let translator = self.deps.translator.as_ref();

        if let Err(e) = validator::validate_field(compiled, field, &model) {
            self.messages.set(section, field, e.message(translator));
            return Err(e);
        }
        self.messages.clear(section, field);

        if let Some(dependent) = dependent {
            if model.get(field) == model.get(dependent) {
                self.messages.clear(section, dependent);
            }
            if let Err(e) = validator::validate_field(compiled, dependent, &model) {
                self.messages.set(section, dependent, e.message(translator));
                return Err(e);
            }
        }
        Ok(())
    }

    /// Leave the form, asking first when there are unsaved edits.
    pub async fn cancel(&self) -> CancelOutcome {
        let changed = {
            let model = self.lock_model();
            self.deps.store.changed_attributes(&model)
        };

        if self.policy.has_changed(&changed) {
            let translator = self.deps.translator.as_ref();
            let prompt = Notification::warning(translator.translate("global.form.cancelcicked", &[]))
                .with_actions(
                    translator.translate("global.form.confirmcancel", &[]),
                    translator.translate("global.form.onsecondthought", &[]),
                );
            let mut handle = self.deps.notifier.post(prompt);
            let choice = handle.choice().await;
            handle.cancel();
            if choice != Some(PromptChoice::Confirm) {
                tracing::debug!(module = %self.context.module, "cancel declined");
                return CancelOutcome::Kept;
            }
        }

        let transition = {
            let mut model = self.lock_model();
            self.policy
                .after_cancel(&mut model, self.deps.store.as_ref(), &self.context)
        };
        let navigated = transition.map(|t| self.deps.router.transition_to(t));
        CancelOutcome::Cancelled { navigated }
    }

    /// Discard uncommitted edits on the model.
    pub fn reset_model_attributes(&self) {
        let mut model = self.lock_model();
        self.deps.store.rollback(&mut model);
    }

    /// Delete `record` after the user confirms.
    ///
    /// Prompts use the `views.app.<module>.list.<model>` message keys.
    pub async fn destroy_with_confirmation(
        &self,
        record: &Record,
        label: &str,
    ) -> Result<DestroyOutcome, StoreError> {
        let key_prefix = format!("views.app.{}.list.{}", self.context.module, record.model());
        destroy_with_confirmation(
            self.deps.store.as_ref(),
            self.deps.notifier.as_ref(),
            self.deps.translator.as_ref(),
            record,
            label,
            &key_prefix,
        )
        .await
    }

    fn report_invalid(&self, section: &str, errors: &ErrorSet) {
        let translator = self.deps.translator.as_ref();
        let messages: Messages = errors.messages(translator);
        self.messages.replace_section(section, &messages);

        let lines: Vec<String> = errors
            .fields()
            .into_iter()
            .filter_map(|field| errors.for_field(field))
            .map(|error| {
                let key = self.context.label_key(&error.field);
                let label = translator.lookup(&key).unwrap_or_else(|| error.field.clone());
                format!("{}: {}", label, error.message(translator))
            })
            .collect();
        tracing::debug!(section, failures = lines.len(), "validation failed");
        self.deps.notifier.post(Notification::error(lines.join("\n")));
    }

    fn post_failure(&self, error: &StoreError) {
        let message = self
            .policy
            .failure_message(error, self.deps.translator.as_ref());
        self.deps.notifier.post(Notification::error(message));
    }

    fn set_state(&self, next: FormState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        tracing::trace!(from = %*state, to = %next, "form state");
        *state = next;
    }

    fn lock_model(&self) -> MutexGuard<'_, Record> {
        self.model.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::policy::DefaultPolicy;
    use crate::i18n::MessageCatalog;
    use crate::notify::{NotificationLevel, RecordingNotifier};
    use crate::router::AppRouter;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    const METADATA: &str = r#"{"sections": [{"name": "signup", "fields": [
        {"name": "name", "validations": {"default": {"rules": [{"name": "required"}]}}},
        {"name": "password", "validations": {"default": {"rules": [{"name": "required"}]}}},
        {"name": "confirmPassword", "validations": {"default": {"rules": [
            {"name": "required"}, {"name": "oneOf", "value": ["password"]}
        ]}}}
    ]}]}"#;

    struct Harness {
        notifier: RecordingNotifier,
        router: Arc<AppRouter>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                notifier: RecordingNotifier::new(),
                router: Arc::new(AppRouter::new()),
            }
        }

        fn deps(&self, store: Arc<dyn Store>) -> Collaborators {
            Collaborators {
                store,
                notifier: Arc::new(self.notifier.clone()),
                translator: Arc::new(MessageCatalog::english()),
                router: self.router.clone(),
            }
        }

        fn controller<P: FormPolicy>(&self, policy: P, store: Arc<dyn Store>) -> FormController<P> {
            FormController::compile(
                &FormMetadata::from_json(METADATA).unwrap(),
                PredicateRegistry::new(),
                policy,
                FormContext::new("user"),
                self.deps(store),
                Record::new("user"),
            )
            .unwrap()
        }
    }

    fn fill(controller: &FormController<impl FormPolicy>) {
        controller.set("name", "Ada");
        controller.set("password", "s3cret");
        controller.set("confirmPassword", "s3cret");
    }

    #[derive(Default)]
    struct CallLog {
        calls: StdMutex<Vec<&'static str>>,
    }

    impl CallLog {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl FormPolicy for Arc<CallLog> {
        fn before_validate(&self, _model: &mut Record, _ctx: &FormContext) {
            self.push("before_validate");
        }

        fn before_save(&self, model: &mut Record, _ctx: &FormContext) {
            self.push("before_save");
            model.remove("confirmPassword");
        }

        async fn after_save(
            &self,
            saved: &Record,
            store: &dyn Store,
            _ctx: &FormContext,
        ) -> anyhow::Result<()> {
            self.push("after_save");
            let mut child = Record::new("membership");
            child.set("userId", saved.id().unwrap_or_default());
            store.save(child).await?;
            Ok(())
        }

        fn success_message(&self, saved: &Record, _translator: &dyn Translator) -> String {
            self.push("success_message");
            format!("Welcome {}", saved.get_str("name").unwrap_or_default())
        }

        fn navigate_to_success(&self, saved: &Record, _ctx: &FormContext) -> Option<Transition> {
            self.push("navigate_to_success");
            Some(Transition::new("app.user").with_param("id", saved.id().unwrap_or_default()))
        }

        fn after_cancel(
            &self,
            _model: &mut Record,
            _store: &dyn Store,
            _ctx: &FormContext,
        ) -> Option<Transition> {
            self.push("after_cancel");
            Some(Transition::new("app.users"))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl Store for FailingStore {
        async fn save(&self, _record: Record) -> Result<Record, StoreError> {
            Err(StoreError::Status {
                status: 500,
                body: "database is down".into(),
            })
        }

        async fn destroy(&self, _record: &Record) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct GatedStore {
        gate: Arc<Notify>,
        inner: MemoryStore,
    }

    #[async_trait]
    impl Store for GatedStore {
        async fn save(&self, record: Record) -> Result<Record, StoreError> {
            self.gate.notified().await;
            self.inner.save(record).await
        }

        async fn destroy(&self, record: &Record) -> Result<(), StoreError> {
            self.inner.destroy(record).await
        }
    }

    #[tokio::test]
    async fn invalid_save_notifies_once_and_persists_nothing() {
        let harness = Harness::new();
        let store = Arc::new(MemoryStore::new());
        let controller = harness.controller(DefaultPolicy, store.clone());

        let outcome = controller.save("signup").await.unwrap();
        let SaveOutcome::Invalid(errors) = outcome else {
            panic!("expected an invalid outcome");
        };
        assert_eq!(errors.fields(), vec!["name", "password", "confirmPassword"]);
        assert!(store.is_empty());
        assert_eq!(controller.state(), FormState::Idle);

        let posted = harness.notifier.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].level, NotificationLevel::Error);
        assert_eq!(posted[0].message.lines().count(), 3);
        assert!(posted[0].message.starts_with("name: This field is required"));

        assert_eq!(
            controller.messages().get("signup", "password").as_deref(),
            Some("This field is required")
        );
    }

    #[tokio::test]
    async fn labels_come_from_the_translator_when_present() {
        let harness = Harness::new();
        let mut catalog = MessageCatalog::english();
        catalog.insert("views.app.user.fields.name", "Full name");
        let mut deps = harness.deps(Arc::new(MemoryStore::new()));
        deps.translator = Arc::new(catalog);
        let controller = FormController::compile(
            &FormMetadata::from_json(METADATA).unwrap(),
            PredicateRegistry::new(),
            DefaultPolicy,
            FormContext::new("user"),
            deps,
            Record::new("user"),
        )
        .unwrap();

        controller.save("signup").await.unwrap();
        let message = &harness.notifier.posted()[0].message;
        assert!(message.starts_with("Full name: "));
        assert!(message.contains("password: "));
    }

    #[tokio::test]
    async fn valid_save_runs_hooks_in_order() {
        let harness = Harness::new();
        let store = Arc::new(MemoryStore::new());
        let policy = Arc::new(CallLog::default());
        let controller = harness.controller(policy.clone(), store.clone());
        fill(&controller);

        let outcome = controller.save("signup").await.unwrap();
        let SaveOutcome::Saved { record, navigated } = outcome else {
            panic!("expected a saved outcome");
        };

        assert_eq!(
            policy.calls(),
            vec![
                "before_validate",
                "before_save",
                "after_save",
                "success_message",
                "navigate_to_success"
            ]
        );
        assert!(record.get("confirmPassword").is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(controller.model().id(), record.id());

        let navigated = navigated.unwrap();
        assert_eq!(navigated.to, "app.user");
        assert_eq!(harness.router.current_route(), Some(navigated));

        let posted = harness.notifier.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].message, "Welcome Ada");
        assert_eq!(posted[0].level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn persistence_failure_notifies_and_returns_to_idle() {
        let harness = Harness::new();
        let controller = harness.controller(DefaultPolicy, Arc::new(FailingStore));
        fill(&controller);

        let err = controller.save("signup").await.unwrap_err();
        assert!(matches!(
            err,
            FormError::Persistence(StoreError::Status { status: 500, .. })
        ));
        assert_eq!(controller.state(), FormState::Idle);
        assert!(!controller.is_saving());

        let posted = harness.notifier.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].level, NotificationLevel::Error);
        assert!(posted[0].message.contains("database is down"));
        assert!(harness.router.history().is_empty());
    }

    #[tokio::test]
    async fn second_save_while_in_flight_is_rejected() {
        let harness = Harness::new();
        let gate = Arc::new(Notify::new());
        let store = Arc::new(GatedStore {
            gate: gate.clone(),
            inner: MemoryStore::new(),
        });
        let controller = harness.controller(DefaultPolicy, store.clone());
        fill(&controller);

        let (first, second) = tokio::join!(controller.save("signup"), async {
            let second = controller.save("signup").await;
            gate.notify_one();
            second
        });

        assert!(matches!(first, Ok(SaveOutcome::Saved { .. })));
        assert!(matches!(second, Err(FormError::SaveInProgress)));
        assert_eq!(store.inner.len(), 1);
        assert!(!controller.is_saving());
    }

    #[tokio::test]
    async fn unknown_section_is_an_error() {
        let harness = Harness::new();
        let controller = harness.controller(DefaultPolicy, Arc::new(MemoryStore::new()));
        assert!(matches!(
            controller.save("nope").await,
            Err(FormError::UnknownSection(_))
        ));
        assert!(!controller.is_saving());
    }

    #[test]
    fn dependent_field_is_cleared_then_revalidated() {
        let harness = Harness::new();
        let controller = harness.controller(DefaultPolicy, Arc::new(MemoryStore::new()));

        controller.set("password", "s3cret");
        controller.set("confirmPassword", "other");
        let err = controller
            .validate_field("signup", "confirmPassword", None)
            .unwrap_err();
        assert_eq!(err.field, "confirmPassword");
        assert!(controller.messages().get("signup", "confirmPassword").is_some());

        // Editing the primary field to match clears the dependent message.
        controller.set("password", "other");
        controller
            .validate_field("signup", "password", Some("confirmPassword"))
            .unwrap();
        assert!(controller.messages().get("signup", "confirmPassword").is_none());

        // A mismatch after editing the primary is recorded on the dependent.
        controller.set("password", "changed-again");
        let err = controller
            .validate_field("signup", "password", Some("confirmPassword"))
            .unwrap_err();
        assert_eq!(err.field, "confirmPassword");
        assert!(controller.messages().get("signup", "password").is_none());
        assert_eq!(
            controller.messages().get("signup", "confirmPassword").as_deref(),
            Some("Must match password")
        );
    }

    #[test]
    fn validate_field_ignores_undeclared_fields() {
        let harness = Harness::new();
        let controller = harness.controller(DefaultPolicy, Arc::new(MemoryStore::new()));
        assert!(controller.validate_field("signup", "nickname", None).is_ok());
        assert!(controller.validate_field("other", "name", None).is_ok());
        assert!(controller.messages().snapshot().is_empty());
    }

    #[tokio::test]
    async fn cancel_without_changes_skips_the_prompt() {
        let harness = Harness::new();
        let policy = Arc::new(CallLog::default());
        let controller = harness.controller(policy.clone(), Arc::new(MemoryStore::new()));

        let outcome = controller.cancel().await;
        assert_eq!(
            outcome,
            CancelOutcome::Cancelled {
                navigated: Some(Transition::new("app.users"))
            }
        );
        assert_eq!(policy.calls(), vec!["after_cancel"]);
        assert!(harness.notifier.posted().is_empty());
    }

    #[tokio::test]
    async fn cancel_with_changes_waits_for_confirmation() {
        let harness = Harness::new();
        let policy = Arc::new(CallLog::default());
        let controller = harness.controller(policy.clone(), Arc::new(MemoryStore::new()));
        controller.set("name", "Ada");

        harness.notifier.answer_next(Some(PromptChoice::Cancel));
        assert_eq!(controller.cancel().await, CancelOutcome::Kept);
        assert!(policy.calls().is_empty());

        harness.notifier.answer_next(Some(PromptChoice::Confirm));
        assert!(matches!(
            controller.cancel().await,
            CancelOutcome::Cancelled { .. }
        ));
        assert_eq!(policy.calls(), vec!["after_cancel"]);

        let prompts = harness.notifier.posted();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().all(|p| p.actions.is_some()));
        assert_eq!(harness.router.current_route().unwrap().to, "app.users");
    }

    #[test]
    fn reset_model_attributes_discards_edits() {
        let harness = Harness::new();
        let controller = harness.controller(DefaultPolicy, Arc::new(MemoryStore::new()));
        controller.set("name", "Ada");
        controller.reset_model_attributes();
        assert!(controller.model().get("name").is_none());
    }
}
