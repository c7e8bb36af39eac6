//! Federated assertion verification seam.

use async_trait::async_trait;

use crate::error::AssertionError;

/// Claims extracted from a verified federated assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedClaims {
    /// Email asserted by the provider. Flows reject assertions without one.
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// The provider's stable subject id for the user.
    pub subject: String,
}

/// Checks a third-party identity token's signature and audience.
#[async_trait]
pub trait AssertionVerifier: Send + Sync {
    async fn verify(
        &self,
        assertion: &str,
        audience: &str,
    ) -> Result<FederatedClaims, AssertionError>;
}
