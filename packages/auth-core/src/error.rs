use thiserror::Error;

/// Failures reported by the identity provider.
///
/// Mirrors the provider's failure set for each operation; anything the
/// provider reports outside that set lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("too many attempts, try again later")]
    TooManyRequests,

    #[error("email already in use")]
    EmailInUse,

    #[error("password is too weak")]
    WeakPassword,

    #[error("invalid phone number")]
    InvalidPhoneNumber,

    #[error("verification widget failed: {0}")]
    VerifierFailed(String),

    #[error("invalid code")]
    InvalidCode,

    #[error("{0}")]
    Other(String),
}

/// Failures reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Error categories surfaced to the current view.
///
/// Every provider or store failure is mapped to exactly one category at the
/// call site and rendered as a single human-readable message; nothing is
/// thrown further up and nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Empty or malformed field, caught before any network call.
    #[error("{0}")]
    InvalidInput(String),

    /// Wrong password or unknown account.
    #[error("incorrect email or password")]
    CredentialRejected,

    /// Email already registered.
    #[error("an account with this email already exists")]
    AccountConflict,

    /// Bad phone format, verifier failure, or rate limiting.
    #[error("could not send verification code: {0}")]
    ChallengeRejected(String),

    /// Wrong or expired one-time code.
    #[error("invalid verification code")]
    CodeRejected,

    /// Any unmapped provider error.
    #[error("something went wrong: {0}")]
    Unknown(String),
}

impl From<ProviderError> for FlowError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCredential => FlowError::CredentialRejected,
            ProviderError::EmailInUse => FlowError::AccountConflict,
            ProviderError::TooManyRequests => {
                FlowError::ChallengeRejected("too many attempts, try again later".to_string())
            }
            ProviderError::InvalidPhoneNumber => {
                FlowError::ChallengeRejected("invalid phone number".to_string())
            }
            ProviderError::VerifierFailed(reason) => FlowError::ChallengeRejected(reason),
            ProviderError::InvalidCode => FlowError::CodeRejected,
            ProviderError::WeakPassword => FlowError::Unknown("password is too weak".to_string()),
            ProviderError::Other(reason) => FlowError::Unknown(reason),
        }
    }
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        FlowError::Unknown(err.to_string())
    }
}
