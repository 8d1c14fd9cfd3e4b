//! The interactive sign-in/sign-up flow.
//!
//! `AuthFlowController` drives both credential paths as an explicit state
//! machine over the infrastructure traits:
//!
//!   Idle -> {EmailSubmitting | PhoneNumberEntry} -> OtpPending
//!        -> Verifying -> {Resolved | Failed}
//!
//! `Resolved` is terminal and triggers the role-based redirect; `Failed`
//! surfaces one mapped error and accepts input again.

pub mod controller;
pub mod countdown;
pub mod state;

pub use controller::{AuthFlowController, OtpChallenge, SignupForm};
pub use countdown::{ResendCountdown, RESEND_COOLDOWN_SECS};
pub use state::AuthPhase;
