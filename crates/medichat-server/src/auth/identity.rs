use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// The authenticated caller behind a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token is unknown, malformed or expired
    #[error("session rejected: {0}")]
    Rejected(String),

    #[error("identity service unreachable: {0}")]
    Transport(String),
}

/// Maps a bearer token to the caller it was issued to
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, IdentityError>;
}

/// Asks the hosted auth service (`GET {auth_url}/user`) who owns the token
pub struct RemoteIdentityResolver {
    client: Client,
    auth_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl RemoteIdentityResolver {
    pub fn new(client: Client, auth_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl IdentityResolver for RemoteIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, IdentityError> {
        let mut request = self
            .client
            .get(format!("{}/user", self.auth_url))
            .bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let user: AuthUser = response
                    .json()
                    .await
                    .map_err(|err| IdentityError::Rejected(format!("unreadable user: {err}")))?;
                if user.id.trim().is_empty() {
                    return Err(IdentityError::Rejected("user has no id".to_string()));
                }
                Ok(CallerIdentity {
                    user_id: user.id,
                    email: user.email,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Rejected(
                format!("auth service answered {}", response.status().as_u16()),
            )),
            status => Err(IdentityError::Transport(format!(
                "auth service answered {}",
                status.as_u16()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies HS256 session tokens locally
pub struct JwtIdentityResolver {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, IdentityError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|err| IdentityError::Rejected(err.to_string()))?;
        let user_id = data
            .claims
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or_else(|| IdentityError::Rejected("token has no subject".to_string()))?;
        Ok(CallerIdentity {
            user_id,
            email: data.claims.email,
        })
    }
}
