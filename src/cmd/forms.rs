//! Built-in forms: `p4m forms list|show|submit`.

use anyhow::{Context, Result, bail};
use console::style;
use p4m_client::auth::{Authenticator, Session, notify_session_expired};
use p4m_client::config::ClientConfig;
use p4m_client::errors::FormError;
use p4m_client::form::{Collaborators, FormContext, FormController, FormPolicy, SaveOutcome, TrackedProject};
use p4m_client::forms::{
    FormKind, IssueCreatePolicy, ProjectCreatePolicy, ResetPasswordPolicy, ResetPasswordStore,
    WikiCreatePolicy,
};
use p4m_client::i18n::Translator;
use p4m_client::notify::Notifier;
use p4m_client::store::{JsonApiStore, MemoryStore, Record, Store};
use p4m_client::ui::TerminalNotifier;
use p4m_client::ui::icons::INFO;
use std::path::Path;
use std::sync::Arc;

use super::signin::load_tokens;
use super::{describe, guarded_router, load_catalog, read_attributes};

pub fn cmd_forms_list() -> Result<()> {
    println!();
    println!("{}", style("Forms").bold());
    println!("=====");
    for kind in FormKind::ALL {
        let metadata = kind.metadata();
        let Some(section) = metadata.section(kind.section()) else {
            continue;
        };
        let fields: Vec<&str> = section.fields.iter().map(|f| f.name.as_str()).collect();
        println!(
            "  {:<15} section {:<14} fields: {}",
            style(kind_name(kind)).cyan(),
            section.name,
            fields.join(", ")
        );
    }
    println!();
    Ok(())
}

pub fn cmd_forms_show(kind: FormKind) -> Result<()> {
    let json = serde_json::to_string_pretty(&kind.metadata()).context("Failed to serialize form metadata")?;
    println!("{}", json);
    Ok(())
}

fn kind_name(kind: FormKind) -> &'static str {
    match kind {
        FormKind::Project => "project",
        FormKind::Issue => "issue",
        FormKind::Wiki => "wiki",
        FormKind::ResetPassword => "reset-password",
    }
}

/// Options of `p4m forms submit`.
#[derive(Debug, Default)]
pub struct SubmitOptions {
    /// Keep records in memory instead of sending them to the API.
    pub dry_run: bool,
    pub assume_yes: bool,
    pub issue_types: Vec<String>,
    pub reporter: Option<String>,
    pub reset_token: Option<String>,
    pub project: Option<TrackedProject>,
}

/// Run a data file through the full form lifecycle.
pub async fn cmd_submit(config: &ClientConfig, kind: FormKind, data: &Path, options: SubmitOptions) -> Result<()> {
    let translator: Arc<dyn Translator> = Arc::new(load_catalog(config)?);
    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier::new(options.assume_yes));
    let router = guarded_router(config);

    let session = Arc::new(Session::new());
    let mut authenticator = None;
    let store: Arc<dyn Store> = if options.dry_run {
        Arc::new(MemoryStore::new())
    } else if kind == FormKind::ResetPassword {
        let token = options
            .reset_token
            .as_deref()
            .context("--reset-token is required for the reset-password form")?;
        Arc::new(ResetPasswordStore::new(config.api(), token))
    } else {
        let tokens = load_tokens(config)?.context("Not signed in; run `p4m signin` first")?;
        let auth = Authenticator::new(config.api(), config.auth(), session.clone());
        if let Err(e) = auth.restore(tokens).await {
            session.mark_expired();
            notify_session_expired(&session, notifier.as_ref(), translator.as_ref());
            return Err(e).context("Stored session could not be restored");
        }
        authenticator = Some(auth);
        Arc::new(JsonApiStore::new(config.api(), Some(session.clone())))
    };

    let deps = Collaborators {
        store,
        notifier,
        translator,
        router,
    };
    let mut context = FormContext::new(kind.module());
    if let Some(project) = options.project.clone() {
        context = context.with_project(project);
    }

    let mut record = Record::new(kind.model());
    for (name, value) in read_attributes(data)? {
        record.set(name, value);
    }

    let result = match kind {
        FormKind::Project => {
            run(kind, ProjectCreatePolicy::new(options.issue_types), context, deps, record).await
        }
        FormKind::Issue => {
            let reporter = options
                .reporter
                .context("--reporter is required for the issue form")?;
            run(kind, IssueCreatePolicy::new(reporter), context, deps, record).await
        }
        FormKind::Wiki => run(kind, WikiCreatePolicy, context, deps, record).await,
        FormKind::ResetPassword => {
            let policy = ResetPasswordPolicy::new(config.routes().signin.as_str());
            run(kind, policy, context, deps, record).await
        }
    };

    if let Some(auth) = authenticator {
        auth.invalidate();
    }
    result
}

async fn run<P: FormPolicy>(
    kind: FormKind,
    policy: P,
    context: FormContext,
    deps: Collaborators,
    record: Record,
) -> Result<()> {
    let form = FormController::compile(&kind.metadata(), kind.predicates(), policy, context, deps, record)?;
    match form.save(kind.section()).await {
        Ok(SaveOutcome::Saved { record, navigated }) => {
            let json = serde_json::to_string_pretty(record.attributes()).context("Failed to serialize record")?;
            println!("{}", json);
            if let Some(transition) = navigated {
                println!("{}{}", INFO, describe(&transition));
            }
            Ok(())
        }
        Ok(SaveOutcome::Invalid(errors)) => {
            bail!("{} rule(s) failed in section '{}'", errors.len(), kind.section())
        }
        Err(FormError::Persistence(e)) => Err(e).context("The record was not saved"),
        Err(e) => Err(e.into()),
    }
}
