//! Integration tests for the auth flow controller.
//!
//! Exercises both credential paths against the mock services: validation
//! gates, the OTP state machine and its resend countdown, role resolution,
//! and the role-based redirect.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use auth_core::error::{FlowError, ProviderError, StoreError};
use auth_core::flow::{AuthFlowController, AuthPhase, SignupForm};
use auth_core::kernel::test_dependencies::{
    MockDocumentStore, MockHumanVerification, MockIdentityProvider, MockNavigator,
};
use auth_core::kernel::{
    BaseDocumentStore, BaseHumanVerification, BaseIdentityProvider, BaseNavigator, FlowDeps,
};
use auth_core::models::{CountryCode, Destination, Role};

// ============================================================================
// Test Helpers
// ============================================================================

struct TestHarness {
    identity: Arc<MockIdentityProvider>,
    documents: Arc<MockDocumentStore>,
    verification: Arc<MockHumanVerification>,
    navigator: Arc<MockNavigator>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_services(MockIdentityProvider::new(), MockDocumentStore::new())
    }

    fn with_services(identity: MockIdentityProvider, documents: MockDocumentStore) -> Self {
        Self {
            identity: Arc::new(identity),
            documents: Arc::new(documents),
            verification: Arc::new(MockHumanVerification::new()),
            navigator: Arc::new(MockNavigator::new()),
        }
    }

    fn controller(&self) -> AuthFlowController {
        AuthFlowController::new(FlowDeps {
            identity: Arc::clone(&self.identity) as Arc<dyn BaseIdentityProvider>,
            documents: Arc::clone(&self.documents) as Arc<dyn BaseDocumentStore>,
            verification: Arc::clone(&self.verification) as Arc<dyn BaseHumanVerification>,
            navigator: Arc::clone(&self.navigator) as Arc<dyn BaseNavigator>,
            country_code: CountryCode::default(),
        })
    }
}

fn farmer_profile(uid: &str) -> serde_json::Value {
    json!({
        "uid": uid,
        "name": "Grower",
        "email": "grower@example.com",
        "role": "Farmer",
        "signupMethod": "email",
        "createdAt": "2025-01-01T00:00:00Z",
    })
}

/// Let spawned countdown tickers catch up with the paused clock.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Email path
// ============================================================================

#[tokio::test]
async fn email_signup_writes_profile_and_redirects() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller
        .sign_up_with_email(SignupForm {
            name: "Asha".to_string(),
            email: "a@b.com".to_string(),
            password: "abc123".to_string(),
            role: Role::Farmer,
        })
        .await;

    assert_eq!(
        controller.phase(),
        &AuthPhase::Resolved(Destination::FarmerDashboard)
    );
    assert!(!controller.is_busy());
    assert_eq!(
        harness.navigator.last_destination(),
        Some(Destination::FarmerDashboard)
    );

    let doc = harness
        .documents
        .document("users", "user-1")
        .expect("profile must be written");
    assert_eq!(doc["uid"], "user-1");
    assert_eq!(doc["name"], "Asha");
    assert_eq!(doc["email"], "a@b.com");
    assert_eq!(doc["role"], "Farmer");
    assert_eq!(doc["signupMethod"], "email");
}

#[tokio::test]
async fn email_signup_with_taken_email_is_a_conflict() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new().with_password_user("a@b.com", "other", "u-0"),
        MockDocumentStore::new(),
    );
    let mut controller = harness.controller();

    controller
        .sign_up_with_email(SignupForm {
            name: String::new(),
            email: "a@b.com".to_string(),
            password: "abc123".to_string(),
            role: Role::Buyer,
        })
        .await;

    assert_eq!(
        controller.phase(),
        &AuthPhase::Failed(FlowError::AccountConflict)
    );
    assert_eq!(harness.documents.set_call_count(), 0);
}

#[tokio::test]
async fn email_sign_in_redirects_by_stored_role() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new().with_password_user("b@c.com", "hunter2", "buyer-1"),
        MockDocumentStore::new().with_document(
            "users",
            "buyer-1",
            json!({
                "uid": "buyer-1",
                "email": "b@c.com",
                "role": "Buyer",
                "signupMethod": "email",
                "createdAt": "2025-01-01T00:00:00Z",
            }),
        ),
    );
    let mut controller = harness.controller();

    controller.sign_in_with_email("b@c.com", "hunter2").await;

    assert_eq!(
        controller.phase(),
        &AuthPhase::Resolved(Destination::BuyerDashboard)
    );
    assert_eq!(
        harness.navigator.destinations(),
        vec![Destination::BuyerDashboard]
    );
}

#[tokio::test]
async fn sign_in_with_unknown_role_falls_back_home() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new().with_password_user("x@y.com", "pw", "u-9"),
        MockDocumentStore::new().with_document(
            "users",
            "u-9",
            json!({
                "uid": "u-9",
                "role": "Admin",
                "signupMethod": "email",
                "createdAt": "2025-01-01T00:00:00Z",
            }),
        ),
    );
    let mut controller = harness.controller();

    controller.sign_in_with_email("x@y.com", "pw").await;

    assert_eq!(controller.phase(), &AuthPhase::Resolved(Destination::Home));
}

#[tokio::test]
async fn sign_in_without_profile_falls_back_home() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new().with_password_user("x@y.com", "pw", "u-9"),
        MockDocumentStore::new(),
    );
    let mut controller = harness.controller();

    controller.sign_in_with_email("x@y.com", "pw").await;

    assert_eq!(controller.phase(), &AuthPhase::Resolved(Destination::Home));
    assert_eq!(harness.navigator.last_destination(), Some(Destination::Home));
}

#[tokio::test]
async fn wrong_password_fails_and_form_stays_editable() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new().with_password_user("b@c.com", "hunter2", "buyer-1"),
        MockDocumentStore::new().with_document("users", "buyer-1", farmer_profile("buyer-1")),
    );
    let mut controller = harness.controller();

    controller.sign_in_with_email("b@c.com", "wrong").await;

    assert_eq!(
        controller.phase(),
        &AuthPhase::Failed(FlowError::CredentialRejected)
    );
    assert!(!controller.is_busy(), "busy flag cleared on failure");
    assert!(harness.navigator.destinations().is_empty());

    // a fresh submit from the failed state goes through
    controller.sign_in_with_email("b@c.com", "hunter2").await;
    assert!(controller.phase().is_resolved());
    assert_eq!(harness.identity.sign_in_call_count(), 2);
}

#[tokio::test]
async fn empty_credentials_never_reach_the_provider() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.sign_in_with_email("", "").await;

    assert!(matches!(
        controller.last_error(),
        Some(FlowError::InvalidInput(_))
    ));
    assert_eq!(harness.identity.sign_in_call_count(), 0);
}

#[tokio::test]
async fn failed_profile_write_surfaces_unknown_and_leaves_account() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new(),
        MockDocumentStore::new().with_set_error(StoreError::Unavailable("quota".to_string())),
    );
    let mut controller = harness.controller();

    controller
        .sign_up_with_email(SignupForm {
            name: String::new(),
            email: "a@b.com".to_string(),
            password: "abc123".to_string(),
            role: Role::Farmer,
        })
        .await;

    // the account was created; the missing role record is surfaced, not
    // rolled back
    assert!(matches!(
        controller.last_error(),
        Some(FlowError::Unknown(_))
    ));
    assert!(harness.navigator.destinations().is_empty());
}

// ============================================================================
// Phone path
// ============================================================================

#[tokio::test]
async fn send_otp_enters_pending_with_full_cooldown() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.send_otp("9876543210").await;

    assert_eq!(controller.phase(), &AuthPhase::OtpPending);
    assert_eq!(controller.resend_cooldown(), Some(60));
    assert!(!controller.can_resend());
    assert_eq!(
        harness.identity.otp_requests(),
        vec![("+919876543210".to_string(), "mock-verifier".to_string())]
    );
}

#[tokio::test]
async fn invalid_phone_numbers_never_reach_the_provider() {
    for digits in ["123", "12345678901", "98765abcde", ""] {
        let harness = TestHarness::new();
        let mut controller = harness.controller();

        controller.send_otp(digits).await;

        assert!(
            matches!(controller.last_error(), Some(FlowError::InvalidInput(_))),
            "{digits:?} must be rejected locally"
        );
        assert!(
            harness.identity.otp_requests().is_empty(),
            "{digits:?} must not produce a provider call"
        );
    }
}

#[tokio::test]
async fn provider_rejection_surfaces_challenge_error() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new().with_request_otp_error(ProviderError::TooManyRequests),
        MockDocumentStore::new(),
    );
    let mut controller = harness.controller();

    controller.send_otp("9876543210").await;

    assert!(matches!(
        controller.last_error(),
        Some(FlowError::ChallengeRejected(_))
    ));
}

#[tokio::test]
async fn widget_is_attached_once_across_requests() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.send_otp("9876543210").await;
    controller.send_otp("9876543210").await;

    assert_eq!(harness.verification.attach_count(), 1);
    assert!(harness.verification.is_attached());
    assert_eq!(harness.identity.otp_requests().len(), 2);
}

#[tokio::test]
async fn verify_otp_creates_profile_once_and_redirects() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();
    controller.select_role(Role::Buyer);

    controller.send_otp("9876543210").await;
    controller.verify_otp("123456").await;

    assert_eq!(
        controller.phase(),
        &AuthPhase::Resolved(Destination::BuyerDashboard)
    );
    assert_eq!(
        harness.navigator.last_destination(),
        Some(Destination::BuyerDashboard)
    );

    let doc = harness
        .documents
        .document("users", "phone-user-1")
        .expect("profile must be written");
    assert_eq!(doc["role"], "Buyer");
    assert_eq!(doc["signupMethod"], "phone");
    assert_eq!(doc["phone"], "+919876543210");

    // verifying again after resolution is a no-op: no second confirmation,
    // no second profile write
    controller.verify_otp("123456").await;
    assert_eq!(harness.identity.confirm_call_count(), 1);
    assert_eq!(harness.documents.set_call_count(), 1);
    assert_eq!(
        controller.phase(),
        &AuthPhase::Resolved(Destination::BuyerDashboard)
    );
}

#[tokio::test]
async fn existing_profile_is_never_overwritten() {
    let harness = TestHarness::with_services(
        MockIdentityProvider::new().with_phone_user("+919876543210", "grower-7"),
        MockDocumentStore::new().with_document("users", "grower-7", farmer_profile("grower-7")),
    );
    let mut controller = harness.controller();
    controller.select_role(Role::Buyer);

    controller.send_otp("9876543210").await;
    controller.verify_otp("123456").await;

    // the stored role wins over the picker selection
    assert_eq!(
        controller.phase(),
        &AuthPhase::Resolved(Destination::FarmerDashboard)
    );
    assert_eq!(harness.documents.set_call_count(), 0);
}

#[tokio::test]
async fn rejected_code_keeps_the_challenge_alive() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.send_otp("9876543210").await;
    controller.verify_otp("000000").await;

    assert_eq!(controller.phase(), &AuthPhase::Failed(FlowError::CodeRejected));
    assert!(controller.challenge().is_some(), "challenge survives a bad code");
    assert!(!controller.is_busy());

    controller.verify_otp("123456").await;
    assert!(controller.phase().is_resolved());
    assert_eq!(harness.identity.confirm_call_count(), 2);
    assert!(controller.challenge().is_none(), "challenge consumed on success");
}

#[tokio::test]
async fn verify_without_challenge_is_rejected_locally() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.verify_otp("123456").await;

    assert!(matches!(
        controller.last_error(),
        Some(FlowError::InvalidInput(_))
    ));
    assert_eq!(harness.identity.confirm_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn resend_blocked_until_cooldown_elapses() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.send_otp("9876543210").await;
    // Let the freshly spawned ticker arm its interval against the paused
    // clock before we begin advancing time.
    settle().await;
    assert_eq!(controller.resend_cooldown(), Some(60));

    controller.resend_otp().await;
    assert_eq!(
        harness.identity.otp_requests().len(),
        1,
        "resend before the cooldown is a no-op"
    );

    tokio::time::advance(Duration::from_secs(59)).await;
    settle().await;
    assert!(!controller.can_resend(), "still one second short");
    controller.resend_otp().await;
    assert_eq!(harness.identity.otp_requests().len(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert!(controller.can_resend());

    controller.resend_otp().await;
    assert_eq!(harness.identity.otp_requests().len(), 2);
    assert_eq!(
        harness.identity.otp_requests()[1].0,
        "+919876543210",
        "resend goes to the same number"
    );
    assert_eq!(
        controller.resend_cooldown(),
        Some(60),
        "countdown restarts after a resend"
    );
    assert!(!controller.can_resend());
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn detach_releases_the_widget_and_ignores_late_input() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.send_otp("9876543210").await;
    assert!(harness.verification.is_attached());

    controller.detach();
    assert!(!harness.verification.is_attached());

    controller.verify_otp("123456").await;
    assert_eq!(harness.identity.confirm_call_count(), 0);
    assert!(harness.navigator.destinations().is_empty());
}

#[tokio::test]
async fn drop_releases_the_widget() {
    let harness = TestHarness::new();
    let mut controller = harness.controller();

    controller.send_otp("9876543210").await;
    assert!(harness.verification.is_attached());

    drop(controller);
    assert!(!harness.verification.is_attached());
}
