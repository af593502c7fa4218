//! Notification collaborator.
//!
//! Components post toast-style notifications through an injected
//! [`Notifier`]. A notification may carry confirm/cancel actions; the
//! returned [`NotificationHandle`] then resolves to the user's choice and can
//! be updated in place (e.g. "Deleting…" → "Deleted") or dismissed.
//!
//! [`RecordingNotifier`] keeps every post in memory and answers prompts from
//! a script. The interactive terminal implementation lives in `crate::ui`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationLevel::Success => write!(f, "success"),
            NotificationLevel::Info => write!(f, "info"),
            NotificationLevel::Warning => write!(f, "warning"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}

/// Labels of the two buttons on a confirmation notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptActions {
    pub confirm: String,
    pub cancel: String,
}

/// The button the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Confirm,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub show_close_button: bool,
    pub actions: Option<PromptActions>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            show_close_button: true,
            actions: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    /// Attach confirm/cancel buttons.
    pub fn with_actions(mut self, confirm: impl Into<String>, cancel: impl Into<String>) -> Self {
        self.actions = Some(PromptActions {
            confirm: confirm.into(),
            cancel: cancel.into(),
        });
        self
    }
}

/// A posted notification.
#[async_trait]
pub trait NotificationHandle: Send {
    fn id(&self) -> Uuid;

    /// Replace the notification's content (message, level, actions).
    fn update(&self, notification: Notification);

    /// Dismiss the notification.
    fn cancel(&self);

    /// Wait for the user to pick an action.
    ///
    /// `None` when the notification has no actions or was dismissed without a choice.
    async fn choice(&mut self) -> Option<PromptChoice>;
}

/// Posts notifications to the user.
pub trait Notifier: Send + Sync {
    fn post(&self, notification: Notification) -> Box<dyn NotificationHandle>;
}

/// Everything a [`RecordingNotifier`] observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifierEvent {
    Posted(Uuid, Notification),
    Updated(Uuid, Notification),
    Cancelled(Uuid),
}

#[derive(Debug, Default)]
struct RecordingState {
    events: Vec<NotifierEvent>,
    script: VecDeque<Option<PromptChoice>>,
}

/// In-memory notifier that answers prompts from a script.
///
/// Prompts beyond the end of the script resolve to `None` (dismissed).
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer for the next actionable notification.
    pub fn answer_next(&self, choice: Option<PromptChoice>) {
        self.lock().script.push_back(choice);
    }

    pub fn events(&self) -> Vec<NotifierEvent> {
        self.lock().events.clone()
    }

    /// Posted notifications only, in order.
    pub fn posted(&self) -> Vec<Notification> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                NotifierEvent::Posted(_, n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Notifier for RecordingNotifier {
    fn post(&self, notification: Notification) -> Box<dyn NotificationHandle> {
        let id = Uuid::new_v4();
        let mut state = self.lock();
        let choice = if notification.actions.is_some() {
            state.script.pop_front().flatten()
        } else {
            None
        };
        state.events.push(NotifierEvent::Posted(id, notification));
        Box::new(RecordingHandle {
            id,
            choice,
            state: Arc::clone(&self.state),
        })
    }
}

struct RecordingHandle {
    id: Uuid,
    choice: Option<PromptChoice>,
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingHandle {
    fn record(&self, event: NotifierEvent) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .push(event);
    }
}

#[async_trait]
impl NotificationHandle for RecordingHandle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn update(&self, notification: Notification) {
        self.record(NotifierEvent::Updated(self.id, notification));
    }

    fn cancel(&self) {
        self.record(NotifierEvent::Cancelled(self.id));
    }

    async fn choice(&mut self) -> Option<PromptChoice> {
        self.choice.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_choice_only_applies_to_actionable_posts() {
        let notifier = RecordingNotifier::new();
        notifier.answer_next(Some(PromptChoice::Confirm));

        let mut plain = notifier.post(Notification::success("saved"));
        assert_eq!(plain.choice().await, None);

        let mut prompt = notifier.post(Notification::warning("discard?").with_actions("Yes", "No"));
        assert_eq!(prompt.choice().await, Some(PromptChoice::Confirm));
        assert_eq!(prompt.choice().await, None);
    }

    #[tokio::test]
    async fn unscripted_prompt_is_dismissed() {
        let notifier = RecordingNotifier::new();
        let mut prompt = notifier.post(Notification::warning("discard?").with_actions("Yes", "No"));
        assert_eq!(prompt.choice().await, None);
    }

    #[test]
    fn update_and_cancel_are_recorded_against_the_handle() {
        let notifier = RecordingNotifier::new();
        let handle = notifier.post(Notification::warning("delete?"));
        handle.update(Notification::success("deleted"));
        handle.cancel();

        let events = notifier.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], NotifierEvent::Updated(id, n) if *id == handle.id() && n.message == "deleted"));
        assert_eq!(events[2], NotifierEvent::Cancelled(handle.id()));
    }

    #[test]
    fn level_display_is_lowercase() {
        assert_eq!(NotificationLevel::Warning.to_string(), "warning");
    }
}
