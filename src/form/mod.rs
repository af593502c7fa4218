//! Form lifecycle controller.
//!
//! [`FormController`] drives any metadata-described form through
//! validation, persistence, notification and navigation. Form-specific
//! behavior lives in a [`FormPolicy`].

pub mod controller;
pub mod destroy;
pub mod messages;
pub mod policy;

pub use controller::{CancelOutcome, Collaborators, FormController, FormState, SaveOutcome};
pub use destroy::{DestroyOutcome, destroy_with_confirmation};
pub use messages::{MessageState, Messages};
pub use policy::{DefaultPolicy, FormContext, FormPolicy, TrackedProject};
