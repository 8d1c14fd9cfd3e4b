//! Flow dependencies (using traits for testability)
//!
//! `FlowDeps` is the container handed to the session tracker and flow
//! controller. The adapters below wrap the `firebase` REST clients into the
//! infrastructure traits, the session token being shared between the
//! identity and document adapters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use firebase::{FirebaseError, FirebaseOptions, FirestoreClient, IdentityClient};

use crate::config::Config;
use crate::error::{ProviderError, StoreError};
use crate::models::{CountryCode, Principal};

use super::traits::{
    AuthStateCallback, AuthStateSubscription, BaseDocumentStore, BaseHumanVerification,
    BaseIdentityProvider, BaseNavigator, ConfirmationHandle, IssuedChallenge, VerifierHandle,
};

/// Validity window of a phone confirmation session.
const SESSION_INFO_TTL: Duration = Duration::from_secs(600);

type Listeners = Arc<Mutex<HashMap<u64, Arc<dyn Fn(Option<Principal>) + Send + Sync>>>>;

// =============================================================================
// FlowDeps
// =============================================================================

/// Dependencies accessible to the auth flow (using traits for testability)
#[derive(Clone)]
pub struct FlowDeps {
    pub identity: Arc<dyn BaseIdentityProvider>,
    pub documents: Arc<dyn BaseDocumentStore>,
    pub verification: Arc<dyn BaseHumanVerification>,
    pub navigator: Arc<dyn BaseNavigator>,
    pub country_code: CountryCode,
}

/// Wire `FlowDeps` against the hosted backend described by `config`.
pub fn firebase_deps(config: &Config, navigator: Arc<dyn BaseNavigator>) -> FlowDeps {
    let options = FirebaseOptions {
        api_key: config.firebase_api_key.clone(),
        project_id: config.firebase_project_id.clone(),
    };
    let id_token = Arc::new(Mutex::new(None));
    let identity = Arc::new(IdentityAdapter::new(
        IdentityClient::new(options.clone()),
        Arc::clone(&id_token),
    ));
    let documents = Arc::new(FirestoreAdapter::new(
        FirestoreClient::new(options),
        Arc::clone(&id_token),
    ));
    let verification = Arc::new(StaticVerification::new(
        config.recaptcha_token.clone().unwrap_or_default(),
    ));
    FlowDeps {
        identity,
        documents,
        verification,
        navigator,
        country_code: config.country_code.clone(),
    }
}

// =============================================================================
// IdentityClient Adapter (implements BaseIdentityProvider trait)
// =============================================================================

/// Wrapper around `IdentityClient` that implements `BaseIdentityProvider`.
///
/// The REST surface has no push channel, so the adapter keeps the current
/// principal in memory and notifies registered listeners from its own
/// sign-in/sign-out calls.
pub struct IdentityAdapter {
    client: IdentityClient,
    id_token: Arc<Mutex<Option<String>>>,
    current: Mutex<Option<Principal>>,
    listeners: Listeners,
    next_listener_id: AtomicU64,
}

impl IdentityAdapter {
    pub fn new(client: IdentityClient, id_token: Arc<Mutex<Option<String>>>) -> Self {
        Self {
            client,
            id_token,
            current: Mutex::new(None),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener_id: AtomicU64::new(0),
        }
    }

    fn set_session(&self, principal: Option<Principal>, token: Option<String>) {
        *self.id_token.lock().unwrap() = token;
        *self.current.lock().unwrap() = principal.clone();
        let callbacks: Vec<_> = self.listeners.lock().unwrap().values().cloned().collect();
        for callback in callbacks {
            callback(principal.clone());
        }
    }
}

#[async_trait]
impl BaseIdentityProvider for IdentityAdapter {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError> {
        let response = self
            .client
            .sign_in_with_password(email, password)
            .await
            .map_err(map_identity_error)?;
        let principal = Principal {
            uid: response.local_id,
            email: Some(response.email),
            phone_number: None,
        };
        self.set_session(Some(principal.clone()), Some(response.id_token));
        Ok(principal)
    }

    async fn create_user_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError> {
        let response = self
            .client
            .sign_up(email, password)
            .await
            .map_err(map_identity_error)?;
        let principal = Principal {
            uid: response.local_id,
            email: Some(response.email),
            phone_number: None,
        };
        self.set_session(Some(principal.clone()), Some(response.id_token));
        Ok(principal)
    }

    async fn request_otp(
        &self,
        e164_phone: &str,
        verifier: &VerifierHandle,
    ) -> Result<IssuedChallenge, ProviderError> {
        debug!("requesting verification code for {}", e164_phone);
        let response = self
            .client
            .send_verification_code(e164_phone, &verifier.0)
            .await
            .map_err(map_identity_error)?;
        Ok(IssuedChallenge {
            confirmation: ConfirmationHandle(response.session_info),
            expires_in: SESSION_INFO_TTL,
        })
    }

    async fn confirm_otp(
        &self,
        confirmation: &ConfirmationHandle,
        code: &str,
    ) -> Result<Principal, ProviderError> {
        let response = self
            .client
            .sign_in_with_phone_number(&confirmation.0, code)
            .await
            .map_err(map_identity_error)?;
        let principal = Principal {
            uid: response.local_id,
            email: None,
            phone_number: response.phone_number,
        };
        self.set_session(Some(principal.clone()), Some(response.id_token));
        Ok(principal)
    }

    fn observe_auth_state(&self, callback: AuthStateCallback) -> AuthStateSubscription {
        let callback: Arc<dyn Fn(Option<Principal>) + Send + Sync> = Arc::from(callback);
        callback(self.current.lock().unwrap().clone());
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().insert(id, callback);
        let listeners = Arc::clone(&self.listeners);
        AuthStateSubscription::new(move || {
            listeners.lock().unwrap().remove(&id);
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.set_session(None, None);
        Ok(())
    }
}

// =============================================================================
// FirestoreClient Adapter (implements BaseDocumentStore trait)
// =============================================================================

/// Wrapper around `FirestoreClient` that implements `BaseDocumentStore`.
pub struct FirestoreAdapter {
    client: FirestoreClient,
    id_token: Arc<Mutex<Option<String>>>,
}

impl FirestoreAdapter {
    pub fn new(client: FirestoreClient, id_token: Arc<Mutex<Option<String>>>) -> Self {
        Self { client, id_token }
    }

    fn bearer(&self) -> Option<String> {
        self.id_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseDocumentStore for FirestoreAdapter {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        self.client
            .get_document(collection, id, self.bearer().as_deref())
            .await
            .map_err(map_store_error)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        self.client
            .set_document(collection, id, &document, self.bearer().as_deref())
            .await
            .map_err(map_store_error)
    }
}

// =============================================================================
// Human verification (headless widget stand-in)
// =============================================================================

/// Widget stand-in for environments without a rendered page: yields a
/// pre-obtained token while still enforcing single attachment.
pub struct StaticVerification {
    token: String,
    attached: AtomicBool,
}

impl StaticVerification {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            attached: AtomicBool::new(false),
        }
    }
}

impl BaseHumanVerification for StaticVerification {
    fn attach(&self) -> Result<VerifierHandle, ProviderError> {
        if self.attached.swap(true, Ordering::SeqCst) {
            return Err(ProviderError::VerifierFailed(
                "widget already attached".to_string(),
            ));
        }
        Ok(VerifierHandle(self.token.clone()))
    }

    fn detach(&self, _handle: &VerifierHandle) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Error mapping
// =============================================================================

fn map_identity_error(err: FirebaseError) -> ProviderError {
    match err {
        FirebaseError::Api { code } => {
            // some codes arrive as "WEAK_PASSWORD : Password should be ..."
            let head = code
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            match head.as_str() {
                "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
                | "USER_DISABLED" => ProviderError::InvalidCredential,
                "EMAIL_EXISTS" => ProviderError::EmailInUse,
                "WEAK_PASSWORD" => ProviderError::WeakPassword,
                "INVALID_PHONE_NUMBER" | "MISSING_PHONE_NUMBER" => {
                    ProviderError::InvalidPhoneNumber
                }
                "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => {
                    ProviderError::TooManyRequests
                }
                "CAPTCHA_CHECK_FAILED" | "MISSING_RECAPTCHA_TOKEN"
                | "INVALID_RECAPTCHA_TOKEN" => ProviderError::VerifierFailed(code),
                "INVALID_CODE" | "MISSING_CODE" | "SESSION_EXPIRED" | "INVALID_SESSION_INFO" => {
                    ProviderError::InvalidCode
                }
                _ => ProviderError::Other(code),
            }
        }
        other => ProviderError::Other(other.to_string()),
    }
}

fn map_store_error(err: FirebaseError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}
