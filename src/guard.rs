//! Route access guard.
//!
//! The guard hooks the router's `RouteWillChange` event once and redirects
//! every transition the [`AccessPolicy`] refuses to the access-denied route.
//! A denial is a redirect, never an error.

use crate::config::RoutesConfig;
use crate::router::{Router, RouterEvent, Transition};
use crate::util::route_matches;
use std::sync::{Arc, RwLock};

/// Decides whether the current user may enter a route.
pub trait AccessPolicy: Send + Sync {
    fn has_route_access(&self, route: &str) -> bool;
}

/// Pattern-based route access list.
///
/// Public routes are always reachable. Other routes must match one of the
/// granted patterns; grants can change at runtime once the user's
/// permissions are loaded.
#[derive(Debug, Default)]
pub struct RouteAcl {
    public: Vec<String>,
    granted: RwLock<Vec<String>>,
}

impl RouteAcl {
    pub fn new(public: Vec<String>, granted: Vec<String>) -> Self {
        Self {
            public,
            granted: RwLock::new(granted),
        }
    }

    pub fn from_config(routes: &RoutesConfig) -> Self {
        Self::new(routes.public.clone(), routes.allow.clone())
    }

    pub fn grant(&self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        let mut granted = self.granted.write().unwrap_or_else(|e| e.into_inner());
        if !granted.contains(&pattern) {
            granted.push(pattern);
        }
    }

    /// Replace every grant, e.g. after the signed-in user changes.
    pub fn replace_grants(&self, patterns: Vec<String>) {
        *self.granted.write().unwrap_or_else(|e| e.into_inner()) = patterns;
    }
}

impl AccessPolicy for RouteAcl {
    fn has_route_access(&self, route: &str) -> bool {
        if self.public.iter().any(|p| route_matches(p, route)) {
            return true;
        }
        self.granted
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|p| route_matches(p, route))
    }
}

const GUARD_LISTENER: &str = "access-guard";

/// Redirects denied transitions to a fixed route.
#[derive(Clone)]
pub struct AccessGuard {
    policy: Arc<dyn AccessPolicy>,
    denied_route: String,
}

impl AccessGuard {
    pub fn new(policy: Arc<dyn AccessPolicy>, denied_route: impl Into<String>) -> Self {
        Self {
            policy,
            denied_route: denied_route.into(),
        }
    }

    /// Install the guard on `router`.
    ///
    /// Returns `false` without registering when an access guard is already
    /// installed. Other `RouteWillChange` listeners do not count.
    pub fn register(&self, router: &dyn Router) -> bool {
        let event = RouterEvent::RouteWillChange;
        let guard = self.clone();
        let listener = Arc::new(move |transition: &Transition| guard.check(transition));
        if !router.on_keyed(event, GUARD_LISTENER, listener) {
            tracing::debug!(event = event.as_str(), "route guard already registered");
            return false;
        }
        tracing::debug!(event = event.as_str(), "route guard registered");
        true
    }

    /// The redirect for `transition`, or `None` when it may proceed.
    pub fn check(&self, transition: &Transition) -> Option<Transition> {
        if transition.to == self.denied_route || self.policy.has_route_access(&transition.to) {
            return None;
        }
        tracing::info!(route = %transition.to, "route access denied");
        Some(Transition::new(self.denied_route.clone()))
    }
}
