//! Router collaborator.
//!
//! Routes are dotted names (`app.project.issue.create`) with string params.
//! Listeners on [`RouterEvent::RouteWillChange`] see every attempted
//! transition and may redirect it; [`AppRouter`] follows redirects up to a
//! fixed depth and records the routes actually entered.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Maximum chained redirects followed for a single transition.
const MAX_REDIRECTS: usize = 8;

pub type RouteParams = BTreeMap<String, String>;

/// A requested (or completed) move to a named route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub to: String,
    pub params: RouteParams,
}

impl Transition {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            params: RouteParams::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterEvent {
    /// Fired before a transition; a listener may return a redirect.
    RouteWillChange,
    /// Fired after the final route has been entered.
    RouteDidChange,
}

impl RouterEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouterEvent::RouteWillChange => "routeWillChange",
            RouterEvent::RouteDidChange => "routeDidChange",
        }
    }
}

/// Listener callback. Returning `Some` redirects the transition.
pub type RouteListener = Arc<dyn Fn(&Transition) -> Option<Transition> + Send + Sync>;

pub trait Router: Send + Sync {
    /// Attempt a transition and return the route that was actually entered.
    fn transition_to(&self, transition: Transition) -> Transition;

    /// Whether any listener is registered for `event`.
    fn has_listener(&self, event: RouterEvent) -> bool;

    fn on(&self, event: RouterEvent, listener: RouteListener);

    /// Register `listener` under `key`. Returns `false` and leaves the router
    /// unchanged when `key` is already taken for `event`.
    fn on_keyed(&self, event: RouterEvent, key: &str, listener: RouteListener) -> bool;

    fn current_route(&self) -> Option<Transition>;
}

/// In-process router with redirect following and a transition history.
#[derive(Default)]
pub struct AppRouter {
    listeners: Mutex<HashMap<RouterEvent, Vec<RouteListener>>>,
    keys: Mutex<HashSet<(RouterEvent, String)>>,
    history: Mutex<Vec<Transition>>,
}

impl AppRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes entered so far, oldest first.
    pub fn history(&self) -> Vec<Transition> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn listeners_for(&self, event: RouterEvent) -> Vec<RouteListener> {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event)
            .cloned()
            .unwrap_or_default()
    }
}

impl Router for AppRouter {
    fn transition_to(&self, transition: Transition) -> Transition {
        let will_change = self.listeners_for(RouterEvent::RouteWillChange);
        let mut target = transition;
        let mut redirects = 0;

        while let Some(next) = will_change.iter().find_map(|listener| listener(&target)) {
            if next == target {
                break;
            }
            redirects += 1;
            tracing::debug!(from = %target.to, to = %next.to, "transition redirected");
            target = next;
            if redirects >= MAX_REDIRECTS {
                tracing::warn!(route = %target.to, "redirect limit reached; entering last target");
                break;
            }
        }

        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(target.clone());
        for listener in self.listeners_for(RouterEvent::RouteDidChange) {
            listener(&target);
        }
        target
    }

    fn has_listener(&self, event: RouterEvent) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event)
            .is_some_and(|listeners| !listeners.is_empty())
    }

    fn on(&self, event: RouterEvent, listener: RouteListener) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event)
            .or_default()
            .push(listener);
    }

    fn on_keyed(&self, event: RouterEvent, key: &str, listener: RouteListener) -> bool {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert((event, key.to_string())) {
            return false;
        }
        self.on(event, listener);
        true
    }

    fn current_route(&self) -> Option<Transition> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

/// Navigation bar entry point: transition to `route`, attaching the tracked
/// project when one is selected.
pub fn navigate(
    router: &dyn Router,
    route: &str,
    params: Option<RouteParams>,
    project_id: Option<&str>,
) -> Transition {
    tracing::debug!(route, "navigation requested");
    let mut transition = Transition::new(route);
    if let Some(params) = params {
        transition.params = params;
    }
    if let Some(project_id) = project_id {
        transition
            .params
            .insert("project_id".to_string(), project_id.to_string());
    }
    router.transition_to(transition)
}
