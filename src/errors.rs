//! Typed error hierarchy for the client core.
//!
//! One enum per subsystem:
//! - `SchemaError`: descriptor compilation failures
//! - `FormError`: save/cancel pipeline failures surfaced by the form controller
//! - `StoreError`: persistence collaborator failures
//! - `AuthError`: token grant, refresh and session failures
//!
//! Per-field validation failures are not errors in this sense; they are
//! reported as [`crate::schema::FieldError`] values inside a `ValidationResult`.

use thiserror::Error;

/// Errors raised while compiling section descriptors into a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Field {section}.{field} references unknown predicate '{predicate}'")]
    UnknownPredicate {
        section: String,
        field: String,
        predicate: String,
    },

    #[error("Field {section}.{field} is declared twice")]
    DuplicateField { section: String, field: String },

    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },
}

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{model} record {id} not found")]
    NotFound { model: String, id: String },

    #[error("Failed to decode server payload: {0}")]
    Decode(String),

    #[error("Record of type {model} has no id")]
    MissingId { model: String },
}

/// Errors surfaced by the form lifecycle controller.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("A save is already in progress for this form")]
    SaveInProgress,

    #[error("Section '{0}' is not part of the compiled schema")]
    UnknownSection(String),

    #[error("Saving the record failed: {0}")]
    Persistence(#[source] StoreError),

    #[error("Record saved but the post-save step failed: {0:#}")]
    AfterSave(anyhow::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors from the OAuth authenticator, refresh scheduler and session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Token endpoint rejected the request ({status}): {error}")]
    Rejected { status: u16, error: String },

    #[error("access_token is missing in server response")]
    MissingAccessToken,

    #[error("Session is not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// The OAuth error code reported by the server, when there is one.
    ///
    /// The sign-in screen keys its messages on this (`views.signin.<code>`).
    pub fn oauth_code(&self) -> Option<&str> {
        match self {
            AuthError::Rejected { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }
}
