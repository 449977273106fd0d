use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_ENV: &str = "MEDICHAT_RELAY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "relay.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub identity: IdentitySection,
    #[serde(default)]
    pub roles: RolesSection,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_route")]
    pub route: String,
    /// Allowed origins; empty or `*` allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            route: default_route(),
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// Ask the hosted auth service who owns the token
    #[default]
    Remote,
    /// Verify HS256 tokens locally
    Jwt,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySection {
    #[serde(default)]
    pub mode: IdentityMode,
    /// Auth root, e.g. `https://project.example.co/auth/v1`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            mode: IdentityMode::default(),
            url: None,
            api_key: None,
            jwt_secret: None,
            audience: None,
            timeout_secs: default_collaborator_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleStoreMode {
    /// Query the `user_roles` table over REST
    #[default]
    Rest,
    /// Use the `assignments` table below
    Static,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolesSection {
    #[serde(default)]
    pub mode: RoleStoreMode,
    /// REST root, e.g. `https://project.example.co/rest/v1`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub service_key: Option<String>,
    #[serde(default = "default_required_role")]
    pub required_role: String,
    /// user id -> roles, for `mode = "static"`
    #[serde(default)]
    pub assignments: HashMap<String, Vec<String>>,
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

impl Default for RolesSection {
    fn default() -> Self {
        Self {
            mode: RoleStoreMode::default(),
            url: None,
            service_key: None,
            required_role: default_required_role(),
            assignments: HashMap::new(),
            timeout_secs: default_collaborator_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Bound on waiting for the provider's response headers
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_route() -> String {
    "/medical-chat".to_string()
}

fn default_max_body_bytes() -> usize {
    12 * 1024 * 1024
}

fn default_collaborator_timeout() -> u64 {
    10
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_required_role() -> String {
    "admin".to_string()
}

fn default_provider_url() -> String {
    "https://ai.gateway.lovable.dev/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

impl RelayConfig {
    /// Load from `MEDICHAT_RELAY_CONFIG` or `./relay.toml`, then apply
    /// `MEDICHAT_*` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = load_from_file()?.unwrap_or_default();
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).map_err(|err| anyhow::anyhow!("Failed to parse config: {}", err))
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
        Self::from_toml(&contents).map_err(|err| anyhow::anyhow!("{} ({})", err, path.display()))
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = get("MEDICHAT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("MEDICHAT_PORT").and_then(|value| value.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(url) = get("MEDICHAT_AUTH_URL") {
            self.identity.url = Some(url);
        }
        if let Some(key) = get("MEDICHAT_AUTH_API_KEY") {
            self.identity.api_key = Some(key);
        }
        if let Some(secret) = get("MEDICHAT_JWT_SECRET") {
            self.identity.jwt_secret = Some(secret);
        }
        if let Some(url) = get("MEDICHAT_ROLES_URL") {
            self.roles.url = Some(url);
        }
        if let Some(key) = get("MEDICHAT_SERVICE_KEY") {
            self.roles.service_key = Some(key);
        }
        if let Some(role) = get("MEDICHAT_REQUIRED_ROLE") {
            self.roles.required_role = role;
        }
        if let Some(url) = get("MEDICHAT_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        if let Some(model) = get("MEDICHAT_MODEL") {
            self.provider.model = model;
        }
        if let Some(key) = get("MEDICHAT_PROVIDER_API_KEY") {
            self.provider.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider.api_key.is_none() {
            anyhow::bail!("Provider API key is not configured (MEDICHAT_PROVIDER_API_KEY)");
        }
        match self.identity.mode {
            IdentityMode::Remote if self.identity.url.is_none() => {
                anyhow::bail!("identity.url is required for remote identity resolution")
            }
            IdentityMode::Jwt if self.identity.jwt_secret.is_none() => {
                anyhow::bail!("identity.jwt_secret is required for jwt identity resolution")
            }
            _ => {}
        }
        if self.roles.mode == RoleStoreMode::Rest && self.roles.url.is_none() {
            anyhow::bail!("roles.url is required for the rest role store");
        }
        if self.roles.required_role.trim().is_empty() {
            anyhow::bail!("roles.required_role must not be empty");
        }
        Ok(())
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity.timeout_secs)
    }

    pub fn roles_timeout(&self) -> Duration {
        Duration::from_secs(self.roles.timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }
}

fn load_from_file() -> anyhow::Result<Option<RelayConfig>> {
    let config_path = env::var(CONFIG_ENV).ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        Some(DEFAULT_CONFIG_FILE.to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    RelayConfig::from_path(Path::new(&path)).map(Some)
}
