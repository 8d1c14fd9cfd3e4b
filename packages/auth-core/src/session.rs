//! Session tracking: a pure observer over the identity provider's auth state.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::ProviderError;
use crate::kernel::{AuthStateSubscription, BaseIdentityProvider};
use crate::models::Principal;

/// Auth state as reported by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The provider has not reported initial state yet.
    Loading,
    SignedOut,
    SignedIn(Principal),
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::SignedIn(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }
}

/// What a protected view should do for a given session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render nothing until the provider reports initial state.
    Wait,
    RedirectToLogin,
    Allow,
}

/// Routing decision for a protected view.
pub fn guard_protected_route(state: &SessionState) -> GuardDecision {
    match state {
        SessionState::Loading => GuardDecision::Wait,
        SessionState::SignedOut => GuardDecision::RedirectToLogin,
        SessionState::SignedIn(_) => GuardDecision::Allow,
    }
}

/// Holds the current principal (or none) for the lifetime of the page.
///
/// Registers exactly one listener with the identity provider; `on_change`
/// fires once when the provider reports initial state and on every later
/// sign-in/sign-out. The listener is released on `unsubscribe` (idempotent)
/// or on drop; the provider owns reconnection, nothing is retried here.
pub struct SessionTracker {
    identity: Arc<dyn BaseIdentityProvider>,
    state: Arc<RwLock<SessionState>>,
    subscription: AuthStateSubscription,
}

impl SessionTracker {
    pub fn subscribe<F>(identity: Arc<dyn BaseIdentityProvider>, on_change: F) -> Self
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let state = Arc::new(RwLock::new(SessionState::Loading));
        let cell = Arc::clone(&state);
        let subscription = identity.observe_auth_state(Box::new(move |principal| {
            let next = match principal {
                Some(principal) => SessionState::SignedIn(principal),
                None => SessionState::SignedOut,
            };
            debug!("auth state changed: signed_in={}", next.is_signed_in());
            *cell.write().unwrap() = next.clone();
            on_change(&next);
        }));
        Self {
            identity,
            state,
            subscription,
        }
    }

    /// Snapshot of the last observed state.
    pub fn current(&self) -> SessionState {
        self.state.read().unwrap().clone()
    }

    /// Release the provider listener. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        self.subscription.unsubscribe();
    }

    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        self.identity.sign_out().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockIdentityProvider;
    use std::sync::Mutex;

    fn principal(uid: &str) -> Principal {
        Principal {
            uid: uid.to_string(),
            email: None,
            phone_number: Some("+919876543210".to_string()),
        }
    }

    #[test]
    fn test_initial_state_reported_synchronously() {
        let provider = Arc::new(MockIdentityProvider::new());
        let seen: Arc<Mutex<Vec<SessionState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let tracker = SessionTracker::subscribe(provider, move |state| {
            sink.lock().unwrap().push(state.clone());
        });

        assert_eq!(seen.lock().unwrap().as_slice(), &[SessionState::SignedOut]);
        assert_eq!(tracker.current(), SessionState::SignedOut);
    }

    #[test]
    fn test_sign_in_and_sign_out_observed() {
        let provider = Arc::new(MockIdentityProvider::new());
        let seen: Arc<Mutex<Vec<SessionState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let tracker = SessionTracker::subscribe(Arc::clone(&provider) as Arc<dyn BaseIdentityProvider>, move |state| {
            sink.lock().unwrap().push(state.clone());
        });

        provider.emit_auth_state(Some(principal("u-1")));
        assert_eq!(tracker.current(), SessionState::SignedIn(principal("u-1")));

        provider.emit_auth_state(None);
        assert_eq!(tracker.current(), SessionState::SignedOut);
        assert_eq!(seen.lock().unwrap().len(), 3, "initial + two changes");
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_stops_callbacks() {
        let provider = Arc::new(MockIdentityProvider::new());
        let seen: Arc<Mutex<Vec<SessionState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut tracker = SessionTracker::subscribe(Arc::clone(&provider) as Arc<dyn BaseIdentityProvider>, move |state| {
            sink.lock().unwrap().push(state.clone());
        });
        assert_eq!(provider.listener_count(), 1);

        tracker.unsubscribe();
        tracker.unsubscribe();
        assert_eq!(provider.listener_count(), 0);

        provider.emit_auth_state(Some(principal("u-1")));
        assert_eq!(seen.lock().unwrap().len(), 1, "no callbacks after unsubscribe");
    }

    #[test]
    fn test_drop_releases_listener() {
        let provider = Arc::new(MockIdentityProvider::new());
        let tracker = SessionTracker::subscribe(Arc::clone(&provider) as Arc<dyn BaseIdentityProvider>, |_| {});
        assert_eq!(provider.listener_count(), 1);
        drop(tracker);
        assert_eq!(provider.listener_count(), 0);
    }

    #[test]
    fn test_guard_decisions() {
        assert_eq!(guard_protected_route(&SessionState::Loading), GuardDecision::Wait);
        assert_eq!(
            guard_protected_route(&SessionState::SignedOut),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            guard_protected_route(&SessionState::SignedIn(principal("u-1"))),
            GuardDecision::Allow
        );
    }
}
