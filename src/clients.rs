use crate::config::GatewayConfig;
use reqwest::Client;

const USER_AGENT: &str = concat!("outbox-console/", env!("CARGO_PKG_VERSION"));

/// Creates the HTTP client used for every backend call.
///
/// With credentials on, cookies set by the backend are stored and sent back.
pub fn setup_http_client(config: &GatewayConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(config.with_credentials);

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}
