//! Authentication: OAuth2 grants, the session, and background token renewal.
//!
//! - [`oauth`] talks to the token endpoint (password and refresh grants)
//! - [`session`] owns token state and publishes [`SessionEvent`]s
//! - [`scheduler`] renews the access token shortly before it expires
//! - [`authenticator`] ties them together for sign-in, restore and sign-out

pub mod authenticator;
pub mod oauth;
pub mod scheduler;
pub mod session;

pub use authenticator::Authenticator;
pub use oauth::{OAuthClient, TokenRenewer, TokenResponse};
pub use scheduler::{RefreshScheduler, Scheduled, SkipReason};
pub use session::{Session, SessionEvent, TokenState, notify_session_expired};

/// Wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Expiry in ms since the epoch for a lifetime of `secs` seconds starting at `now_ms`.
///
/// `None` when the result does not fit an `i64`.
pub(crate) fn expiry_ms(now_ms: i64, secs: u64) -> Option<i64> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| s.checked_mul(1000))
        .and_then(|ms| now_ms.checked_add(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_checked() {
        assert_eq!(expiry_ms(1_000, 60), Some(61_000));
        assert_eq!(expiry_ms(0, u64::MAX), None);
        assert_eq!(expiry_ms(i64::MAX - 10, 1), None);
    }
}
