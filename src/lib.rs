//! Client core for the Projects4Me issue tracker.
//!
//! - [`schema`] compiles form metadata into validator chains and runs them
//! - [`form`] drives a form through validate, save, notify and navigate
//! - [`forms`] holds the tracker's concrete forms
//! - [`auth`] signs in with OAuth2 and keeps the access token fresh
//! - [`guard`] keeps the router out of routes the user may not enter

pub mod auth;
pub mod config;
pub mod errors;
pub mod form;
pub mod forms;
pub mod guard;
pub mod i18n;
pub mod logging;
pub mod milestone;
pub mod notify;
pub mod router;
pub mod schema;
pub mod store;
pub mod ui;
pub mod util;
