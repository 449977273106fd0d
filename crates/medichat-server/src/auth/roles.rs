use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use url::Url;

/// Roles granted to one caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Error)]
pub enum RoleStoreError {
    #[error("role store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only lookup of the roles assigned to a user
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn roles_for(&self, user_id: &str) -> Result<RoleSet, RoleStoreError>;
}

/// Reads the `user_roles` table through a PostgREST-style endpoint
pub struct RestRoleStore {
    client: Client,
    base_url: Url,
    service_key: Option<String>,
}

#[derive(Deserialize)]
struct RoleRow {
    role: String,
}

impl RestRoleStore {
    /// `base_url` is the REST root, e.g. `https://project.example.co/rest/v1`
    pub fn new(
        client: Client,
        base_url: &str,
        service_key: Option<String>,
    ) -> Result<Self, url::ParseError> {
        let mut root = base_url.trim_end_matches('/').to_string();
        root.push('/');
        Ok(Self {
            client,
            base_url: Url::parse(&root)?,
            service_key,
        })
    }

    fn lookup_url(&self, user_id: &str) -> Result<Url, RoleStoreError> {
        let mut url = self
            .base_url
            .join("user_roles")
            .map_err(|err| RoleStoreError::Unavailable(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{user_id}"))
            .append_pair("select", "role");
        Ok(url)
    }
}

#[async_trait]
impl RoleStore for RestRoleStore {
    async fn roles_for(&self, user_id: &str) -> Result<RoleSet, RoleStoreError> {
        let mut request = self.client.get(self.lookup_url(user_id)?);
        if let Some(key) = &self.service_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RoleStoreError::Unavailable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RoleStoreError::Unavailable(format!(
                "role lookup answered {}",
                status.as_u16()
            )));
        }

        let rows: Vec<RoleRow> = response
            .json()
            .await
            .map_err(|err| RoleStoreError::Unavailable(format!("unreadable roles: {err}")))?;
        Ok(rows.into_iter().map(|row| row.role).collect())
    }
}

/// Fixed user → roles assignments
#[derive(Debug, Default)]
pub struct StaticRoleStore {
    assignments: HashMap<String, RoleSet>,
}

impl StaticRoleStore {
    pub fn new(assignments: &HashMap<String, Vec<String>>) -> Self {
        Self {
            assignments: assignments
                .iter()
                .map(|(user, roles)| (user.clone(), roles.iter().cloned().collect()))
                .collect(),
        }
    }
}

#[async_trait]
impl RoleStore for StaticRoleStore {
    async fn roles_for(&self, user_id: &str) -> Result<RoleSet, RoleStoreError> {
        Ok(self.assignments.get(user_id).cloned().unwrap_or_default())
    }
}
