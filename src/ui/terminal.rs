use crate::notify::{
    Notification, NotificationHandle, NotificationLevel, Notifier, PromptChoice,
};
use crate::ui::icons::{ERROR, INFO, SUCCESS, WARNING};
use async_trait::async_trait;
use console::style;
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use std::io::IsTerminal;
use uuid::Uuid;

/// Notifier that prints to stderr and asks prompts with `dialoguer`.
///
/// When stdin is not a terminal (or `--yes` was given) prompts are answered
/// without asking: `assume_yes` confirms, otherwise the prompt is dismissed.
#[derive(Debug, Clone, Default)]
pub struct TerminalNotifier {
    assume_yes: bool,
}

impl TerminalNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

/// Render a notification as a single styled line.
pub fn render(notification: &Notification) -> String {
    let message = &notification.message;
    match notification.level {
        NotificationLevel::Success => format!("{}{}", SUCCESS, style(message).green()),
        NotificationLevel::Info => format!("{}{}", INFO, style(message).cyan()),
        NotificationLevel::Warning => format!("{}{}", WARNING, style(message).yellow()),
        NotificationLevel::Error => format!("{}{}", ERROR, style(message).red().bold()),
    }
}

impl Notifier for TerminalNotifier {
    fn post(&self, notification: Notification) -> Box<dyn NotificationHandle> {
        let id = Uuid::new_v4();
        if notification.actions.is_none() {
            eprintln!("{}", render(&notification));
        }
        Box::new(TerminalHandle {
            id,
            pending: Some(notification),
            assume_yes: self.assume_yes,
        })
    }
}

struct TerminalHandle {
    id: Uuid,
    pending: Option<Notification>,
    assume_yes: bool,
}

#[async_trait]
impl NotificationHandle for TerminalHandle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn update(&self, notification: Notification) {
        eprintln!("{}", render(&notification));
    }

    fn cancel(&self) {}

    async fn choice(&mut self) -> Option<PromptChoice> {
        let notification = self.pending.take()?;
        let actions = notification.actions.clone()?;

        if self.assume_yes {
            eprintln!("{}", render(&notification));
            return Some(PromptChoice::Confirm);
        }
        if !std::io::stdin().is_terminal() {
            eprintln!("{}", render(&notification));
            return None;
        }

        let prompt = render(&notification);
        let picked = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&[actions.confirm.as_str(), actions.cancel.as_str()])
                .default(1)
                .interact_opt()
        })
        .await;

        match picked {
            Ok(Ok(Some(0))) => Some(PromptChoice::Confirm),
            Ok(Ok(Some(_))) => Some(PromptChoice::Cancel),
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "prompt failed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "prompt task failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_keeps_the_message_text() {
        let line = render(&Notification::error("Saving failed"));
        assert!(line.contains("Saving failed"));
    }

    #[tokio::test]
    async fn assume_yes_confirms_prompts() {
        let notifier = TerminalNotifier::new(true);
        let mut handle = notifier.post(Notification::warning("discard?").with_actions("Yes", "No"));
        assert_eq!(handle.choice().await, Some(PromptChoice::Confirm));
    }

    #[tokio::test]
    async fn plain_notifications_have_no_choice() {
        let notifier = TerminalNotifier::new(true);
        let mut handle = notifier.post(Notification::success("saved"));
        assert_eq!(handle.choice().await, None);
    }
}
