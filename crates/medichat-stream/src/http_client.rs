use reqwest::Client;
use std::time::Duration;

const DISABLE_SYSTEM_PROXY_ENV: &str = "MEDICHAT_DISABLE_SYSTEM_PROXY";
const USER_AGENT: &str = concat!("medichat-stream/", env!("CARGO_PKG_VERSION"));

/// Streaming responses can run long, so only connecting is bounded
pub(crate) fn build_http_client() -> Client {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10));
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() || cfg!(test) {
        builder = builder.no_proxy();
    }
    builder.build().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Falling back to default HTTP client");
        Client::new()
    })
}
