use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub outbox_base_url: Option<String>,
    #[serde(default = "default_with_credentials")]
    pub outbox_with_credentials: bool,
    pub outbox_request_timeout_ms: Option<u64>,
    #[serde(default = "default_page_size")]
    pub outbox_page_size: u32,
    pub sentry_dsn: Option<String>,
}

fn default_with_credentials() -> bool {
    true
}

fn default_page_size() -> u32 {
    20 // Same default the admin table used
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Builds a config from an explicit set of variables instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;

        // Manually check that OUTBOX_BASE_URL was provided
        if config.outbox_base_url.is_none() {
            return Err(envy::Error::MissingValue("OUTBOX_BASE_URL"));
        }
        if config.outbox_page_size == 0 {
            return Err(envy::Error::Custom(
                "OUTBOX_PAGE_SIZE must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Validates the connection settings and hands them over as a gateway config.
    pub fn gateway(&self) -> Result<GatewayConfig, envy::Error> {
        let raw = self
            .outbox_base_url
            .as_deref()
            .ok_or(envy::Error::MissingValue("OUTBOX_BASE_URL"))?;
        let base_url = Url::parse(raw)
            .map_err(|e| envy::Error::Custom(format!("OUTBOX_BASE_URL is not a valid URL: {e}")))?;

        Ok(GatewayConfig {
            with_credentials: self.outbox_with_credentials,
            timeout: self.outbox_request_timeout_ms.map(Duration::from_millis),
            ..GatewayConfig::new(base_url)
        })
    }
}

/// Everything the gateway needs to reach the backend.
///
/// Built once and handed to the gateway at construction.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: Url,
    /// Keep cookies between calls and send them back.
    pub with_credentials: bool,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            with_credentials: true,
            timeout: None,
        }
    }

    /// Resolves an endpoint path against the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }
}
