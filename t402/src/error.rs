//! Infrastructure error types.
//!
//! Business failures never surface here — verify/settle return response
//! values with reason codes instead. These errors cover the cases where
//! an operation could not be carried out at all: no registered scheme,
//! nothing matching a challenge, a hook-signaled abort, a misconfigured
//! server.

use std::fmt;

/// Errors from x402 payment operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PaymentError {
    /// No scheme registered for a scheme/network combination.
    #[error(transparent)]
    SchemeNotFound(#[from] SchemeNotFoundError),

    /// No challenge entry matches any registered scheme.
    #[error(transparent)]
    NoMatchingRequirements(#[from] NoMatchingRequirementsError),

    /// A before-hook aborted the operation.
    #[error(transparent)]
    Aborted(#[from] PaymentAbortedError),

    /// The resource server's configured routes failed validation.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}

/// No registered scheme handles the given scheme/network combination.
#[derive(Debug, Clone)]
pub struct SchemeNotFoundError {
    /// The requested scheme.
    pub scheme: String,
    /// The requested network.
    pub network: String,
}

impl SchemeNotFoundError {
    /// Creates the error for a scheme/network pair.
    #[must_use]
    pub fn new(scheme: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            network: network.into(),
        }
    }
}

impl fmt::Display for SchemeNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no scheme '{}' registered for network '{}'",
            self.scheme, self.network
        )
    }
}

impl std::error::Error for SchemeNotFoundError {}

/// None of the challenge's requirements can be fulfilled.
#[derive(Debug, Clone)]
pub struct NoMatchingRequirementsError {
    /// Why nothing matched.
    pub reason: String,
}

impl NoMatchingRequirementsError {
    /// Creates the error with a reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for NoMatchingRequirementsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for NoMatchingRequirementsError {}

/// A before-hook signaled an abort.
///
/// Distinct from a generic failure so callers can tell a policy decision
/// apart from an operational error.
#[derive(Debug, Clone)]
pub struct PaymentAbortedError {
    /// The abort reason supplied by the hook.
    pub reason: String,
}

impl PaymentAbortedError {
    /// Creates the error with the hook's reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PaymentAbortedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment aborted: {}", self.reason)
    }
}

impl std::error::Error for PaymentAbortedError {}

/// Route validation failed during resource-server initialization.
///
/// Carries one message per missing (scheme, network) combination so a
/// misconfigured server reports every gap at once.
#[derive(Debug, Clone)]
pub struct InitializationError {
    /// One entry per route that lacks local or remote support.
    pub missing: Vec<String>,
}

impl InitializationError {
    /// Creates the error from the collected gaps.
    #[must_use]
    pub const fn new(missing: Vec<String>) -> Self {
        Self { missing }
    }
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource server initialization failed: {}",
            self.missing.join("; ")
        )
    }
}

impl std::error::Error for InitializationError {}
