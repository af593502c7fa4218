use super::{field, required, section};
use crate::config::ApiConfig;
use crate::errors::StoreError;
use crate::form::{FormContext, FormPolicy};
use crate::i18n::Translator;
use crate::router::Transition;
use crate::schema::{FormMetadata, RuleDescriptor};
use crate::store::{Record, Store};
use async_trait::async_trait;
use serde::Serialize;

pub const SECTION: &str = "resetPassword";
pub const MODEL: &str = "resetpassword";

pub fn metadata() -> FormMetadata {
    FormMetadata {
        sections: vec![section(
            SECTION,
            vec![
                required("password"),
                field(
                    "passwordConfirmation",
                    vec![
                        RuleDescriptor::Required,
                        RuleDescriptor::OneOf {
                            reference: "password".to_string(),
                        },
                    ],
                ),
            ],
        )],
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetRequest<'a> {
    password: &'a str,
    reset_token: &'a str,
}

/// Sends a new password for a reset token. Only `save` is supported.
pub struct ResetPasswordStore {
    client: reqwest::Client,
    url: String,
    reset_token: String,
}

impl ResetPasswordStore {
    pub fn new(api: &ApiConfig, reset_token: impl Into<String>) -> Self {
        let reset_token = reset_token.into();
        Self {
            client: reqwest::Client::new(),
            url: api.reset_password_url(&reset_token),
            reset_token,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Store for ResetPasswordStore {
    async fn save(&self, record: Record) -> Result<Record, StoreError> {
        let body = ResetRequest {
            password: record.get_str("password").unwrap_or_default(),
            reset_token: &self.reset_token,
        };
        tracing::debug!(url = %self.url, "submitting password reset");
        let response = self
            .client
            .patch(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(StoreError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut saved = record;
        saved.set_id(self.reset_token.as_str());
        saved.commit();
        Ok(saved)
    }

    async fn destroy(&self, record: &Record) -> Result<(), StoreError> {
        Err(StoreError::NotFound {
            model: record.model().to_string(),
            id: self.reset_token.clone(),
        })
    }
}

/// Password reset: fixed success and failure texts, then back to sign-in.
#[derive(Debug, Clone)]
pub struct ResetPasswordPolicy {
    signin_route: String,
}

impl ResetPasswordPolicy {
    pub fn new(signin_route: impl Into<String>) -> Self {
        Self {
            signin_route: signin_route.into(),
        }
    }
}

impl Default for ResetPasswordPolicy {
    fn default() -> Self {
        Self::new("signin")
    }
}

#[async_trait]
impl FormPolicy for ResetPasswordPolicy {
    fn success_message(&self, _saved: &Record, translator: &dyn Translator) -> String {
        translator.translate("views.signin.resetPassword.success", &[])
    }

    fn navigate_to_success(&self, _saved: &Record, _ctx: &FormContext) -> Option<Transition> {
        Some(Transition::new(self.signin_route.as_str()))
    }

    fn failure_message(&self, error: &StoreError, translator: &dyn Translator) -> String {
        tracing::debug!(%error, "password reset rejected");
        translator.translate("views.signin.resetPassword.error", &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Collaborators, FormController, SaveOutcome};
    use crate::i18n::MessageCatalog;
    use crate::notify::RecordingNotifier;
    use crate::router::AppRouter;
    use crate::schema::{PredicateRegistry, RuleKind};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn controller(notifier: &RecordingNotifier) -> FormController<ResetPasswordPolicy> {
        FormController::compile(
            &metadata(),
            PredicateRegistry::new(),
            ResetPasswordPolicy::default(),
            FormContext::new("user"),
            Collaborators {
                store: Arc::new(MemoryStore::new()),
                notifier: Arc::new(notifier.clone()),
                translator: Arc::new(MessageCatalog::english()),
                router: Arc::new(AppRouter::new()),
            },
            Record::new(MODEL),
        )
        .unwrap()
    }

    #[test]
    fn url_embeds_the_reset_token() {
        let api = ApiConfig {
            host: "http://tracker.test".into(),
            ..ApiConfig::default()
        };
        let store = ResetPasswordStore::new(&api, "tok-1");
        assert_eq!(store.url(), "http://tracker.test/api/v1/resetpassword/tok-1");
    }

    #[test]
    fn request_body_uses_camel_case() {
        let body = serde_json::to_value(ResetRequest {
            password: "s3cret",
            reset_token: "tok-1",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"password": "s3cret", "resetToken": "tok-1"}));
    }

    #[tokio::test]
    async fn mismatched_confirmation_is_rejected() {
        let notifier = RecordingNotifier::new();
        let form = controller(&notifier);
        form.set("password", "s3cret");
        form.set("passwordConfirmation", "s3cre");

        let SaveOutcome::Invalid(errors) = form.save(SECTION).await.unwrap() else {
            panic!("expected mismatch to fail");
        };
        assert_eq!(errors.for_field("passwordConfirmation").unwrap().kind, RuleKind::OneOf);
    }

    #[tokio::test]
    async fn matching_passwords_return_to_signin() {
        let notifier = RecordingNotifier::new();
        let form = controller(&notifier);
        form.set("password", "s3cret");
        form.set("passwordConfirmation", "s3cret");

        let SaveOutcome::Saved { navigated, .. } = form.save(SECTION).await.unwrap() else {
            panic!("expected save");
        };
        assert_eq!(navigated, Some(Transition::new("signin")));
        assert_eq!(
            notifier.posted().last().unwrap().message,
            "Your password has been updated"
        );
    }
}
