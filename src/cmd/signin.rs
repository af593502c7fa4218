//! Password sign-in: `p4m signin`.

use anyhow::{Context, Result};
use dialoguer::Password;
use p4m_client::auth::{Authenticator, Session, TokenState};
use p4m_client::config::ClientConfig;
use p4m_client::i18n::Translator;
use p4m_client::notify::{Notification, Notifier};
use p4m_client::ui::TerminalNotifier;
use p4m_client::ui::icons::KEY;
use std::sync::Arc;

use super::{describe, guarded_router, load_catalog};

/// Tokens saved by the last successful sign-in, if any.
pub(crate) fn load_tokens(config: &ClientConfig) -> Result<Option<TokenState>> {
    let path = config.session_file();
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read session file: {}", path.display()))?;
    let tokens = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
    Ok(Some(tokens))
}

fn save_tokens(config: &ClientConfig, tokens: &TokenState) -> Result<()> {
    let path = config.session_file();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(tokens).context("Failed to serialize session")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write session file: {}", path.display()))?;
    Ok(())
}

pub async fn cmd_signin(
    config: &ClientConfig,
    username: &str,
    password: Option<String>,
    remember_me: bool,
    scope: &[String],
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };

    let translator = load_catalog(config)?;
    let notifier = TerminalNotifier::new(false);
    let router = guarded_router(config);
    let session = Arc::new(Session::new());
    let authenticator = Authenticator::new(config.api(), config.auth(), session.clone());

    let tokens = match authenticator
        .authenticate(username, &password, remember_me, scope)
        .await
    {
        Ok(tokens) => tokens,
        Err(e) => {
            let key = format!("views.signin.{}", e.oauth_code().unwrap_or("error"));
            let message = translator
                .lookup(&key)
                .unwrap_or_else(|| e.to_string());
            notifier.post(Notification::error(message));
            return Err(e).context("Sign-in failed");
        }
    };

    save_tokens(config, &tokens)?;
    let landing = session.handle_authentication(router.as_ref(), &config.routes().after_signin);
    match tokens.expires_in {
        Some(secs) => println!("{}Signed in as {}; token expires in {}s", KEY, username, secs),
        None => println!("{}Signed in as {}", KEY, username),
    }
    println!("  -> {}", describe(&landing));

    authenticator.invalidate();
    Ok(())
}
