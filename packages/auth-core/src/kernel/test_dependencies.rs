// Mock implementations for testing
//
// Scripted stand-ins for the identity provider, document store, verification
// widget and router. Calls are recorded so tests can assert exactly what the
// flow controller did (and did not) reach for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ProviderError, StoreError};
use crate::models::{Destination, Principal};

use super::traits::{
    AuthStateCallback, AuthStateSubscription, BaseDocumentStore, BaseHumanVerification,
    BaseIdentityProvider, BaseNavigator, ConfirmationHandle, IssuedChallenge, VerifierHandle,
};

type Listeners = Arc<Mutex<HashMap<u64, Arc<dyn Fn(Option<Principal>) + Send + Sync>>>>;

// =============================================================================
// Mock Identity Provider
// =============================================================================

pub struct MockIdentityProvider {
    password_users: Mutex<HashMap<String, (String, Principal)>>,
    phone_uids: Mutex<HashMap<String, String>>,
    accepted_code: Mutex<String>,
    request_otp_error: Mutex<Option<ProviderError>>,
    pending: Mutex<HashMap<String, String>>,
    current: Mutex<Option<Principal>>,
    listeners: Listeners,
    next_session: AtomicU64,
    next_uid: AtomicU64,
    next_listener: AtomicU64,
    sign_in_calls: Mutex<Vec<(String, String)>>,
    sign_up_calls: Mutex<Vec<String>>,
    otp_requests: Mutex<Vec<(String, String)>>,
    confirm_calls: Mutex<Vec<String>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            password_users: Mutex::new(HashMap::new()),
            phone_uids: Mutex::new(HashMap::new()),
            accepted_code: Mutex::new("123456".to_string()),
            request_otp_error: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_session: AtomicU64::new(1),
            next_uid: AtomicU64::new(1),
            next_listener: AtomicU64::new(0),
            sign_in_calls: Mutex::new(Vec::new()),
            sign_up_calls: Mutex::new(Vec::new()),
            otp_requests: Mutex::new(Vec::new()),
            confirm_calls: Mutex::new(Vec::new()),
        }
    }

    /// Register an existing email/password account.
    pub fn with_password_user(self, email: &str, password: &str, uid: &str) -> Self {
        let principal = Principal {
            uid: uid.to_string(),
            email: Some(email.to_string()),
            phone_number: None,
        };
        self.password_users
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), principal));
        self
    }

    /// Pin the uid issued for a phone number (otherwise uids are generated).
    pub fn with_phone_user(self, e164: &str, uid: &str) -> Self {
        self.phone_uids
            .lock()
            .unwrap()
            .insert(e164.to_string(), uid.to_string());
        self
    }

    /// Code accepted by `confirm_otp` (default "123456").
    pub fn with_accepted_code(self, code: &str) -> Self {
        *self.accepted_code.lock().unwrap() = code.to_string();
        self
    }

    /// Make every `request_otp` call fail with the given error.
    pub fn with_request_otp_error(self, err: ProviderError) -> Self {
        *self.request_otp_error.lock().unwrap() = Some(err);
        self
    }

    /// Push an auth-state change to all registered listeners.
    pub fn emit_auth_state(&self, principal: Option<Principal>) {
        self.set_current(principal);
    }

    pub fn sign_in_call_count(&self) -> usize {
        self.sign_in_calls.lock().unwrap().len()
    }

    pub fn sign_up_call_count(&self) -> usize {
        self.sign_up_calls.lock().unwrap().len()
    }

    pub fn otp_requests(&self) -> Vec<(String, String)> {
        self.otp_requests.lock().unwrap().clone()
    }

    pub fn confirm_call_count(&self) -> usize {
        self.confirm_calls.lock().unwrap().len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn set_current(&self, principal: Option<Principal>) {
        *self.current.lock().unwrap() = principal.clone();
        let callbacks: Vec<_> = self.listeners.lock().unwrap().values().cloned().collect();
        for callback in callbacks {
            callback(principal.clone());
        }
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseIdentityProvider for MockIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError> {
        self.sign_in_calls
            .lock()
            .unwrap()
            .push((email.to_string(), password.to_string()));
        let principal = match self.password_users.lock().unwrap().get(email) {
            Some((stored, principal)) if stored == password => principal.clone(),
            _ => return Err(ProviderError::InvalidCredential),
        };
        self.set_current(Some(principal.clone()));
        Ok(principal)
    }

    async fn create_user_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError> {
        self.sign_up_calls.lock().unwrap().push(email.to_string());
        let mut users = self.password_users.lock().unwrap();
        if users.contains_key(email) {
            return Err(ProviderError::EmailInUse);
        }
        let uid = format!("user-{}", self.next_uid.fetch_add(1, Ordering::Relaxed));
        let principal = Principal {
            uid,
            email: Some(email.to_string()),
            phone_number: None,
        };
        users.insert(email.to_string(), (password.to_string(), principal.clone()));
        drop(users);
        self.set_current(Some(principal.clone()));
        Ok(principal)
    }

    async fn request_otp(
        &self,
        e164_phone: &str,
        verifier: &VerifierHandle,
    ) -> Result<IssuedChallenge, ProviderError> {
        self.otp_requests
            .lock()
            .unwrap()
            .push((e164_phone.to_string(), verifier.0.clone()));
        if let Some(err) = self.request_otp_error.lock().unwrap().clone() {
            return Err(err);
        }
        let session = format!(
            "session-{}",
            self.next_session.fetch_add(1, Ordering::Relaxed)
        );
        self.pending
            .lock()
            .unwrap()
            .insert(session.clone(), e164_phone.to_string());
        Ok(IssuedChallenge {
            confirmation: ConfirmationHandle(session),
            expires_in: Duration::from_secs(60),
        })
    }

    async fn confirm_otp(
        &self,
        confirmation: &ConfirmationHandle,
        code: &str,
    ) -> Result<Principal, ProviderError> {
        self.confirm_calls.lock().unwrap().push(code.to_string());
        let Some(phone) = self.pending.lock().unwrap().get(&confirmation.0).cloned() else {
            return Err(ProviderError::InvalidCode);
        };
        if *self.accepted_code.lock().unwrap() != code {
            return Err(ProviderError::InvalidCode);
        }
        let uid = self
            .phone_uids
            .lock()
            .unwrap()
            .entry(phone.clone())
            .or_insert_with(|| {
                format!("phone-user-{}", self.next_uid.fetch_add(1, Ordering::Relaxed))
            })
            .clone();
        let principal = Principal {
            uid,
            email: None,
            phone_number: Some(phone),
        };
        self.set_current(Some(principal.clone()));
        Ok(principal)
    }

    fn observe_auth_state(&self, callback: AuthStateCallback) -> AuthStateSubscription {
        let callback: Arc<dyn Fn(Option<Principal>) + Send + Sync> = Arc::from(callback);
        callback(self.current.lock().unwrap().clone());
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().insert(id, callback);
        let listeners = Arc::clone(&self.listeners);
        AuthStateSubscription::new(move || {
            listeners.lock().unwrap().remove(&id);
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.set_current(None);
        Ok(())
    }
}

// =============================================================================
// Mock Document Store
// =============================================================================

pub struct MockDocumentStore {
    documents: Mutex<HashMap<(String, String), Value>>,
    set_error: Mutex<Option<StoreError>>,
    set_calls: Mutex<Vec<(String, String)>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            set_error: Mutex::new(None),
            set_calls: Mutex::new(Vec::new()),
        }
    }

    /// Seed a stored document.
    pub fn with_document(self, collection: &str, id: &str, document: Value) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), document);
        self
    }

    /// Make every `set_document` call fail with the given error.
    pub fn with_set_error(self, err: StoreError) -> Self {
        *self.set_error.lock().unwrap() = Some(err);
        self
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn set_call_count(&self) -> usize {
        self.set_calls.lock().unwrap().len()
    }
}

impl Default for MockDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDocumentStore for MockDocumentStore {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self.document(collection, id))
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        self.set_calls
            .lock()
            .unwrap()
            .push((collection.to_string(), id.to_string()));
        if let Some(err) = self.set_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.documents
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), document);
        Ok(())
    }
}

// =============================================================================
// Mock Human Verification
// =============================================================================

pub struct MockHumanVerification {
    attached: AtomicBool,
    attach_count: AtomicU64,
    attach_error: Mutex<Option<ProviderError>>,
}

impl MockHumanVerification {
    pub fn new() -> Self {
        Self {
            attached: AtomicBool::new(false),
            attach_count: AtomicU64::new(0),
            attach_error: Mutex::new(None),
        }
    }

    /// Make the next `attach` call fail with the given error.
    pub fn with_attach_error(self, err: ProviderError) -> Self {
        *self.attach_error.lock().unwrap() = Some(err);
        self
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn attach_count(&self) -> u64 {
        self.attach_count.load(Ordering::SeqCst)
    }
}

impl Default for MockHumanVerification {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseHumanVerification for MockHumanVerification {
    fn attach(&self) -> Result<VerifierHandle, ProviderError> {
        if let Some(err) = self.attach_error.lock().unwrap().take() {
            return Err(err);
        }
        if self.attached.swap(true, Ordering::SeqCst) {
            return Err(ProviderError::VerifierFailed(
                "widget already attached".to_string(),
            ));
        }
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        Ok(VerifierHandle("mock-verifier".to_string()))
    }

    fn detach(&self, _handle: &VerifierHandle) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Mock Navigator
// =============================================================================

pub struct MockNavigator {
    navigations: Mutex<Vec<Destination>>,
}

impl MockNavigator {
    pub fn new() -> Self {
        Self {
            navigations: Mutex::new(Vec::new()),
        }
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn last_destination(&self) -> Option<Destination> {
        self.navigations.lock().unwrap().last().copied()
    }
}

impl Default for MockNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseNavigator for MockNavigator {
    fn navigate(&self, destination: Destination) {
        self.navigations.lock().unwrap().push(destination);
    }
}
