//! Medichat relay server.
//!
//! Accepts authenticated chat requests from the Medichat client, checks the
//! caller's role, validates and composes the provider request, and relays the
//! provider's event stream back verbatim.

pub mod auth;
pub mod config;
pub mod error;
pub mod provider;
pub mod relay;
pub mod router;
pub mod server;

pub use config::RelayConfig;
pub use error::{ErrorKind, RelayError};
pub use relay::{RelayPolicy, RelayService};

use anyhow::Context;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use auth::{
    IdentityResolver, JwtIdentityResolver, RemoteIdentityResolver, RestRoleStore, RoleStore,
    StaticRoleStore,
};
use config::{IdentityMode, RoleStoreMode};
use provider::HttpModelProvider;

const DISABLE_SYSTEM_PROXY_ENV: &str = "MEDICHAT_DISABLE_SYSTEM_PROXY";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire up the collaborators selected by `config`
pub fn build_service(config: &RelayConfig) -> anyhow::Result<RelayService> {
    let client = build_http_client()?;

    let identity: Arc<dyn IdentityResolver> = match config.identity.mode {
        IdentityMode::Remote => {
            let url = config
                .identity
                .url
                .as_deref()
                .context("identity.url is not configured")?;
            Arc::new(RemoteIdentityResolver::new(
                client.clone(),
                url,
                config.identity.api_key.clone(),
            ))
        }
        IdentityMode::Jwt => {
            let secret = config
                .identity
                .jwt_secret
                .as_deref()
                .context("identity.jwt_secret is not configured")?;
            Arc::new(JwtIdentityResolver::new(
                secret,
                config.identity.audience.as_deref(),
            ))
        }
    };

    let roles: Arc<dyn RoleStore> = match config.roles.mode {
        RoleStoreMode::Rest => {
            let url = config
                .roles
                .url
                .as_deref()
                .context("roles.url is not configured")?;
            Arc::new(
                RestRoleStore::new(client.clone(), url, config.roles.service_key.clone())
                    .with_context(|| format!("invalid roles.url {url}"))?,
            )
        }
        RoleStoreMode::Static => Arc::new(StaticRoleStore::new(&config.roles.assignments)),
    };

    let api_key = config
        .provider
        .api_key
        .as_deref()
        .context("provider.api_key is not configured")?;
    let provider = Arc::new(HttpModelProvider::new(
        client,
        &config.provider.base_url,
        api_key,
    ));

    let policy = RelayPolicy {
        required_role: config.roles.required_role.clone(),
        model: config.provider.model.clone(),
        identity_timeout: config.identity_timeout(),
        roles_timeout: config.roles_timeout(),
        provider_timeout: config.provider_timeout(),
    };

    Ok(RelayService::new(identity, roles, provider, policy))
}

fn build_http_client() -> anyhow::Result<Client> {
    let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        builder = builder.no_proxy();
    }
    builder.build().context("Failed to build HTTP client")
}
