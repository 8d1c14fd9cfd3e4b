// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The flow
// controller and session tracker are written against these seams; real
// implementations live in deps.rs, mocks in test_dependencies.rs.
//
// Naming convention: Base* for trait names (e.g., BaseIdentityProvider)

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ProviderError, StoreError};
use crate::models::{Destination, Principal};

// =============================================================================
// Opaque provider handles
// =============================================================================

/// Handle to an attached human-verification widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierHandle(pub String);

/// Handle to an outstanding OTP confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationHandle(pub String);

/// A challenge issued by the provider in response to an OTP request.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub confirmation: ConfirmationHandle,
    pub expires_in: Duration,
}

// =============================================================================
// Auth-state observation
// =============================================================================

pub type AuthStateCallback = Box<dyn Fn(Option<Principal>) + Send + Sync>;

/// Guard for a registered auth-state listener.
///
/// `unsubscribe` is idempotent and also runs on drop, so the provider's
/// internal listener is released on every exit path.
pub struct AuthStateSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl AuthStateSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for AuthStateSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// =============================================================================
// Identity Provider Trait (Infrastructure - managed auth)
// =============================================================================

#[async_trait]
pub trait BaseIdentityProvider: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError>;

    /// Create a new account with email and password.
    async fn create_user_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError>;

    /// Request an OTP for a phone number in international form. Requires an
    /// attached verification widget.
    async fn request_otp(
        &self,
        e164_phone: &str,
        verifier: &VerifierHandle,
    ) -> Result<IssuedChallenge, ProviderError>;

    /// Confirm an OTP code against an outstanding challenge.
    async fn confirm_otp(
        &self,
        confirmation: &ConfirmationHandle,
        code: &str,
    ) -> Result<Principal, ProviderError>;

    /// Register an auth-state listener. The callback fires once with the
    /// current state and again on every sign-in/sign-out.
    fn observe_auth_state(&self, callback: AuthStateCallback) -> AuthStateSubscription;

    /// End the provider session.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

// =============================================================================
// Document Store Trait (Infrastructure - remote collections)
// =============================================================================

#[async_trait]
pub trait BaseDocumentStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str)
        -> Result<Option<Value>, StoreError>;

    /// Create-or-overwrite a document.
    async fn set_document(&self, collection: &str, id: &str, document: Value)
        -> Result<(), StoreError>;
}

// =============================================================================
// Human Verification Trait (Infrastructure - invisible challenge widget)
// =============================================================================

pub trait BaseHumanVerification: Send + Sync {
    /// Attach the invisible widget. The provider rejects double-registration,
    /// so implementations fail while a previous handle is still attached.
    fn attach(&self) -> Result<VerifierHandle, ProviderError>;

    /// Tear the widget down so a later attach succeeds.
    fn detach(&self, handle: &VerifierHandle);
}

// =============================================================================
// Navigator Trait (Infrastructure - routing surface)
// =============================================================================

pub trait BaseNavigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}
