// FrooteX client auth core
//
// Session tracking and the interactive sign-in/sign-up flows behind the
// FrooteX marketplace dashboards. The identity provider, document store and
// routing surface are external collaborators consumed through the trait
// seams in `kernel`; everything here runs inside a single page lifetime.

pub mod config;
pub mod error;
pub mod flow;
pub mod kernel;
pub mod models;
pub mod session;

pub use config::Config;
pub use error::FlowError;
pub use flow::{AuthFlowController, AuthPhase, SignupForm};
pub use session::{guard_protected_route, GuardDecision, SessionState, SessionTracker};
