use crate::errors::StoreError;
use crate::i18n::Translator;
use crate::notify::{Notification, Notifier, PromptChoice};
use crate::store::{Record, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed,
    /// The user picked the cancel action.
    Kept,
    /// The prompt was closed without a choice.
    Dismissed,
}

/// Ask before deleting `record`, then report through the same notification.
///
/// Message keys under `key_prefix`: `delete` and `deleted` (with `{name}`),
/// `confirmdelete`, `onsecondthought` and `deletecancel`.
pub async fn destroy_with_confirmation(
    store: &dyn Store,
    notifier: &dyn Notifier,
    translator: &dyn Translator,
    record: &Record,
    label: &str,
    key_prefix: &str,
) -> Result<DestroyOutcome, StoreError> {
    let key = |suffix: &str| format!("{key_prefix}.{suffix}");
    let name = [("name", label)];

    let prompt = Notification::warning(translator.translate(&key("delete"), &name)).with_actions(
        translator.translate(&key("confirmdelete"), &[]),
        translator.translate(&key("onsecondthought"), &[]),
    );
    let mut handle = notifier.post(prompt);

    match handle.choice().await {
        Some(PromptChoice::Confirm) => {
            if let Err(e) = store.destroy(record).await {
                tracing::warn!(model = record.model(), id = ?record.id(), error = %e, "destroy failed");
                handle.update(Notification::error(e.to_string()));
                return Err(e);
            }
            tracing::info!(model = record.model(), id = ?record.id(), "record destroyed");
            handle.update(Notification::success(translator.translate(&key("deleted"), &name)));
            Ok(DestroyOutcome::Destroyed)
        }
        Some(PromptChoice::Cancel) => {
            handle.update(Notification::success(translator.translate(&key("deletecancel"), &[])));
            Ok(DestroyOutcome::Kept)
        }
        None => Ok(DestroyOutcome::Dismissed),
    }
}
