use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::{FlowError, ProviderError};
use crate::kernel::{
    BaseHumanVerification, BaseIdentityProvider, BaseNavigator, ConfirmationHandle, FlowDeps,
    VerifierHandle,
};
use crate::models::{Destination, PhoneNumber, Principal, Role, SignupMethod, UserProfile};

use super::countdown::ResendCountdown;
use super::state::AuthPhase;

/// In-flight OTP challenge. At most one per controller; replaced by a resend
/// and discarded once a code is confirmed.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub phone: PhoneNumber,
    pub confirmation: ConfirmationHandle,
    pub expires_in: Duration,
}

/// Fields of the email sign-up form.
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Drives interactive sign-in/sign-up against the identity provider and
/// resolves the stored role into a navigation target.
///
/// One controller per page. The verification widget, the outstanding
/// challenge and the resend countdown are owned exclusively by the controller
/// and released on every exit path, including drop. A busy flag gates
/// re-entrancy: a second submit while one is in flight is a no-op, never
/// queued.
pub struct AuthFlowController {
    deps: FlowDeps,
    phase: AuthPhase,
    busy: bool,
    detached: bool,
    selected_role: Role,
    verifier: Option<VerifierHandle>,
    challenge: Option<OtpChallenge>,
    countdown: Option<ResendCountdown>,
}

impl AuthFlowController {
    pub fn new(deps: FlowDeps) -> Self {
        Self {
            deps,
            phase: AuthPhase::Idle,
            busy: false,
            detached: false,
            // matches the sign-up form's default selection
            selected_role: Role::Farmer,
            verifier: None,
            challenge: None,
            countdown: None,
        }
    }

    // =========================================================================
    // View-facing state
    // =========================================================================

    pub fn phase(&self) -> &AuthPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&FlowError> {
        match &self.phase {
            AuthPhase::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn selected_role(&self) -> Role {
        self.selected_role
    }

    /// Bind the role picker. Read by `verify_otp` for a first-time phone
    /// sign-up; ignored when a profile already exists.
    pub fn select_role(&mut self, role: Role) {
        self.selected_role = role;
    }

    pub fn challenge(&self) -> Option<&OtpChallenge> {
        self.challenge.as_ref()
    }

    /// Seconds left before the code can be re-sent, while a challenge is
    /// outstanding.
    pub fn resend_cooldown(&self) -> Option<u32> {
        self.countdown.as_ref().map(|c| c.remaining())
    }

    pub fn can_resend(&self) -> bool {
        self.countdown.as_ref().is_some_and(|c| c.can_resend())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn sign_in_with_email(&mut self, email: &str, password: &str) {
        if !self.begin(AuthPhase::EmailSubmitting) {
            return;
        }
        if email.trim().is_empty() || password.is_empty() {
            self.fail(FlowError::InvalidInput(
                "email and password are required".to_string(),
            ));
            return;
        }
        match self.deps.identity.sign_in_with_password(email, password).await {
            Ok(principal) => {
                info!("signed in as {}", principal.uid);
                let destination = self.destination_for(&principal).await;
                self.resolve(destination);
            }
            Err(err) => self.fail(err.into()),
        }
    }

    /// Create the account, then write the role record. The two steps are not
    /// transactional: a failed profile write leaves an authenticated account
    /// with no role record, which is surfaced, not repaired.
    pub async fn sign_up_with_email(&mut self, form: SignupForm) {
        if !self.begin(AuthPhase::EmailSubmitting) {
            return;
        }
        if form.email.trim().is_empty() || form.password.is_empty() {
            self.fail(FlowError::InvalidInput(
                "email and password are required".to_string(),
            ));
            return;
        }
        let principal = match self
            .deps
            .identity
            .create_user_with_password(&form.email, &form.password)
            .await
        {
            Ok(principal) => principal,
            Err(err) => {
                self.fail(err.into());
                return;
            }
        };
        let name = form.name.trim();
        let profile = UserProfile {
            uid: principal.uid.clone(),
            name: (!name.is_empty()).then(|| name.to_string()),
            email: Some(form.email.clone()),
            phone: None,
            role: form.role,
            signup_method: SignupMethod::Email,
            created_at: Utc::now(),
        };
        if let Err(err) = profile.create(self.deps.documents.as_ref()).await {
            error!(
                "profile write failed after account creation, {} has no role record: {err}",
                principal.uid
            );
            self.fail(err.into());
            return;
        }
        info!("created account {} with role {}", principal.uid, form.role.as_str());
        self.resolve(Destination::for_role(Some(form.role)));
    }

    /// Request a one-time code for a 10-digit local number. The number is
    /// validated before any provider call; the verification widget is
    /// attached on first use and reused afterwards.
    pub async fn send_otp(&mut self, local_digits: &str) {
        if !self.begin(AuthPhase::PhoneNumberEntry) {
            return;
        }
        let phone = match PhoneNumber::parse(local_digits, &self.deps.country_code) {
            Ok(phone) => phone,
            Err(err) => {
                self.fail(err);
                return;
            }
        };
        let verifier = match self.verifier_handle() {
            Ok(verifier) => verifier,
            Err(err) => {
                self.fail(err.into());
                return;
            }
        };
        match self.deps.identity.request_otp(phone.e164(), &verifier).await {
            Ok(issued) => {
                info!("verification code sent to {}", phone.e164());
                self.challenge = Some(OtpChallenge {
                    phone,
                    confirmation: issued.confirmation,
                    expires_in: issued.expires_in,
                });
                self.countdown = Some(ResendCountdown::start());
                self.phase = AuthPhase::OtpPending;
                self.busy = false;
            }
            Err(err) => self.fail(err.into()),
        }
    }

    /// Confirm the code. On first-time sign-up the role record is written
    /// after an existence check, so a profile from a prior sign-up is never
    /// overwritten. A rejected code keeps the challenge alive.
    pub async fn verify_otp(&mut self, code: &str) {
        if !self.begin(AuthPhase::Verifying) {
            return;
        }
        let code = code.trim();
        if code.is_empty() {
            self.fail(FlowError::InvalidInput(
                "enter the verification code".to_string(),
            ));
            return;
        }
        let Some(challenge) = self.challenge.clone() else {
            self.fail(FlowError::InvalidInput(
                "request a verification code first".to_string(),
            ));
            return;
        };
        match self.deps.identity.confirm_otp(&challenge.confirmation, code).await {
            Ok(principal) => match self.ensure_phone_profile(&principal, &challenge).await {
                Ok(role) => self.resolve(Destination::for_role(role)),
                Err(err) => self.fail(err),
            },
            Err(err) => self.fail(err.into()),
        }
    }

    /// Re-send the code to the same number. Only available once the cooldown
    /// has elapsed; earlier calls are a no-op.
    pub async fn resend_otp(&mut self) {
        if !self.can_resend() {
            return;
        }
        let Some(digits) = self.challenge.as_ref().map(|c| c.phone.local().to_string()) else {
            return;
        };
        self.send_otp(&digits).await;
    }

    /// Tear down view-facing resources: the countdown, the outstanding
    /// challenge and the verification widget. Results arriving after this
    /// are ignored. Also runs on drop.
    pub fn detach(&mut self) {
        self.detached = true;
        self.countdown = None;
        self.challenge = None;
        if let Some(handle) = self.verifier.take() {
            self.deps.verification.detach(&handle);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Gate an operation: refused while detached, while another operation is
    /// in flight, or after the flow has resolved.
    fn begin(&mut self, in_flight: AuthPhase) -> bool {
        if self.detached || self.busy || self.phase.is_resolved() {
            return false;
        }
        self.busy = true;
        self.phase = in_flight;
        true
    }

    fn fail(&mut self, err: FlowError) {
        warn!("auth flow failed: {err}");
        self.phase = AuthPhase::Failed(err);
        self.busy = false;
    }

    fn resolve(&mut self, destination: Destination) {
        self.challenge = None;
        self.countdown = None;
        self.phase = AuthPhase::Resolved(destination);
        self.busy = false;
        if !self.detached {
            self.deps.navigator.navigate(destination);
        }
    }

    /// Attach the invisible verification widget on first use. The handle is
    /// reused for every later request; a second attachment never happens
    /// while one is live.
    fn verifier_handle(&mut self) -> Result<VerifierHandle, ProviderError> {
        if let Some(handle) = &self.verifier {
            return Ok(handle.clone());
        }
        let handle = self.deps.verification.attach()?;
        self.verifier = Some(handle.clone());
        Ok(handle)
    }

    /// Role for the redirect after a confirmed code, creating the profile on
    /// first-time sign-up.
    async fn ensure_phone_profile(
        &self,
        principal: &Principal,
        challenge: &OtpChallenge,
    ) -> Result<Option<Role>, FlowError> {
        let store = self.deps.documents.as_ref();
        match UserProfile::find(&principal.uid, store).await {
            Ok(Some(profile)) => return Ok(Some(profile.role)),
            Ok(None) => {}
            Err(err) => return Err(err.into()),
        }
        if UserProfile::exists(&principal.uid, store).await.map_err(FlowError::from)? {
            // document present but not readable as a profile; leave it alone
            warn!("unreadable profile for {}, skipping write", principal.uid);
            return Ok(None);
        }
        let profile = UserProfile {
            uid: principal.uid.clone(),
            name: None,
            email: None,
            phone: Some(challenge.phone.e164().to_string()),
            role: self.selected_role,
            signup_method: SignupMethod::Phone,
            created_at: Utc::now(),
        };
        profile.create(store).await?;
        info!(
            "created profile for {} with role {}",
            principal.uid,
            profile.role.as_str()
        );
        Ok(Some(profile.role))
    }

    /// Redirect target for an authenticated principal, read from the stored
    /// profile. An absent or unreadable role falls back to the home page.
    async fn destination_for(&self, principal: &Principal) -> Destination {
        let role = match UserProfile::find(&principal.uid, self.deps.documents.as_ref()).await {
            Ok(profile) => profile.map(|p| p.role),
            Err(err) => {
                warn!("profile lookup failed for {}: {err}", principal.uid);
                None
            }
        };
        Destination::for_role(role)
    }
}

impl Drop for AuthFlowController {
    fn drop(&mut self) {
        self.detach();
    }
}
