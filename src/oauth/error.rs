use crate::oauth1::SignatureError;
use crate::upstream::UpstreamError;

/// Failures of the three-legged flow.
#[derive(Debug, PartialEq, Clone)]
pub enum FlowError {
    /// Callback arrived without a required query parameter
    MissingParameter(&'static str),
    /// Request token never issued, expired, or already exchanged.
    /// Deliberately carries no detail about which.
    UnknownToken,
    /// The user declined on the upstream authorize page
    AuthorizationDenied,
    /// Upstream rejected the signed request or answered with garbage
    UpstreamAuth(UpstreamError),
    /// Signing failed; indicates a bug
    Signature(SignatureError),
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowError::MissingParameter(name) => write!(f, "Missing '{}' parameter", name),
            FlowError::UnknownToken => write!(f, "Unknown or expired request token"),
            FlowError::AuthorizationDenied => write!(f, "Authorization was denied"),
            FlowError::UpstreamAuth(e) => write!(f, "Upstream authorization failed: {}", e),
            FlowError::Signature(e) => write!(f, "Signature computation failed: {}", e),
        }
    }
}

impl std::error::Error for FlowError {}

impl From<UpstreamError> for FlowError {
    fn from(e: UpstreamError) -> Self {
        FlowError::UpstreamAuth(e)
    }
}

impl From<SignatureError> for FlowError {
    fn from(e: SignatureError) -> Self {
        FlowError::Signature(e)
    }
}
