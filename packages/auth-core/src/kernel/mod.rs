//! Infrastructure seams: trait definitions, the dependency container, and
//! mock implementations for tests and offline runs.

pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use deps::{firebase_deps, FlowDeps, StaticVerification};
pub use traits::{
    AuthStateCallback, AuthStateSubscription, BaseDocumentStore, BaseHumanVerification,
    BaseIdentityProvider, BaseNavigator, ConfirmationHandle, IssuedChallenge, VerifierHandle,
};
