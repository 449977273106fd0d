//! The authenticated relay pipeline.
//!
//! Each request runs the stages strictly in order and stops at the first
//! failure:
//! 1. read the bearer credential
//! 2. resolve the caller's identity
//! 3. check the caller holds the required role
//! 4. parse and validate the payload
//! 5. compose the provider request
//! 6. dispatch it and hand back the provider's event stream untouched

pub mod prompt;
pub mod validation;

use axum::http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthContext, IdentityResolver, RoleStore, extract_bearer};
use crate::error::{RelayError, Result};
use crate::provider::{ByteStream, ModelProvider, ProviderFailure};

pub use prompt::compose;
pub use validation::{ValidatedRequest, parse_request, validate};

/// Per-deployment knobs for the pipeline
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    pub required_role: String,
    pub model: String,
    pub identity_timeout: Duration,
    pub roles_timeout: Duration,
    pub provider_timeout: Duration,
}

pub struct RelayService {
    identity: Arc<dyn IdentityResolver>,
    roles: Arc<dyn RoleStore>,
    provider: Arc<dyn ModelProvider>,
    policy: RelayPolicy,
}

impl RelayService {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        roles: Arc<dyn RoleStore>,
        provider: Arc<dyn ModelProvider>,
        policy: RelayPolicy,
    ) -> Self {
        Self {
            identity,
            roles,
            provider,
            policy,
        }
    }

    pub fn policy(&self) -> &RelayPolicy {
        &self.policy
    }

    /// Run the full pipeline for one request
    pub async fn handle(
        &self,
        authorization: Option<&HeaderValue>,
        body: &[u8],
    ) -> Result<ByteStream> {
        let auth = self.authorize(authorization).await?;
        self.relay(&auth, body).await
    }

    /// Stages 1-3: credential, identity, role
    pub async fn authorize(&self, authorization: Option<&HeaderValue>) -> Result<AuthContext> {
        let Some(token) = extract_bearer(authorization) else {
            warn!("Rejected request without bearer credential");
            return Err(RelayError::MissingCredential);
        };

        let lookup = timeout(self.policy.identity_timeout, self.identity.resolve(&token));
        let caller = match lookup.await {
            Ok(Ok(caller)) => caller,
            Ok(Err(err)) => {
                warn!(error = %err, "Session could not be resolved");
                return Err(RelayError::InvalidSession);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.policy.identity_timeout.as_millis() as u64,
                    "Identity lookup timed out"
                );
                return Err(RelayError::AuthorizationUnavailable);
            }
        };

        let lookup = timeout(self.policy.roles_timeout, self.roles.roles_for(&caller.user_id));
        let roles = match lookup.await {
            Ok(Ok(roles)) => roles,
            Ok(Err(err)) => {
                warn!(user_id = %caller.user_id, error = %err, "Role lookup failed");
                return Err(RelayError::AuthorizationUnavailable);
            }
            Err(_) => {
                warn!(user_id = %caller.user_id, "Role lookup timed out");
                return Err(RelayError::AuthorizationUnavailable);
            }
        };

        if !roles.contains(&self.policy.required_role) {
            warn!(
                user_id = %caller.user_id,
                required_role = %self.policy.required_role,
                "Caller lacks the required role"
            );
            return Err(RelayError::Forbidden);
        }

        Ok(AuthContext { caller, roles })
    }

    /// Stages 4-6 for an authorized caller
    pub async fn relay(&self, auth: &AuthContext, body: &[u8]) -> Result<ByteStream> {
        let request = parse_request(body)
            .and_then(validate)
            .inspect_err(|err| {
                warn!(user_id = %auth.caller.user_id, error = %err, "Rejected relay payload")
            })?;

        let outbound = compose(&request, &self.policy.model);
        debug!(
            user_id = %auth.caller.user_id,
            model = %outbound.model,
            has_image = request.image.is_some(),
            "Dispatching to provider"
        );

        match timeout(self.policy.provider_timeout, self.provider.open_stream(&outbound)).await {
            Ok(Ok(stream)) => {
                info!(user_id = %auth.caller.user_id, "Relaying provider stream");
                Ok(stream)
            }
            Ok(Err(ProviderFailure::Status { status: 429, .. })) => {
                warn!("AI gateway rate limited the request");
                Err(RelayError::RateLimited)
            }
            Ok(Err(ProviderFailure::Status { status: 402, .. })) => {
                warn!("AI gateway requires payment");
                Err(RelayError::PaymentRequired)
            }
            Ok(Err(ProviderFailure::Status { status, body })) => {
                error!(status, body = %body, "AI gateway error");
                Err(RelayError::Provider)
            }
            Ok(Err(ProviderFailure::Transport(err))) => {
                error!(error = %err, "AI gateway unreachable");
                Err(RelayError::Provider)
            }
            Err(_) => {
                error!(
                    timeout_ms = self.policy.provider_timeout.as_millis() as u64,
                    "AI gateway timed out"
                );
                Err(RelayError::Provider)
            }
        }
    }
}
