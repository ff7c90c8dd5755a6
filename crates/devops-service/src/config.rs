use chrono::Duration;
use devops_auth::{AuthorityConfig, DEFAULT_TOKEN_TTL_SECS};
use std::env;

const DEFAULT_PORT: u16 = 5000;
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct ServiceConfig {
    /// API key, signing secret and token lifetime for the token authority
    pub authority: AuthorityConfig,
    /// Server port
    pub port: u16,
    /// Bearer token required for /metrics (None = see `public_metrics`)
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token when no token is configured
    pub public_metrics: bool,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("authority", &self.authority)
            .field("port", &self.port)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|s| !s.is_empty());

        // Required: there is no fallback signing secret.
        let signing_secret = non_empty("JWT_SECRET")
            .ok_or(ConfigError::MissingRequired("JWT_SECRET"))?
            .into_bytes();
        if signing_secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                "JWT_SECRET is only {} bytes (minimum {MIN_SECRET_LEN} recommended); \
                 use `openssl rand -hex 32` to generate a secure secret",
                signing_secret.len()
            );
        }

        let api_key =
            non_empty("DEVOPS_API_KEY").ok_or(ConfigError::MissingRequired("DEVOPS_API_KEY"))?;

        let token_ttl_secs = match non_empty("TOKEN_TTL_SECS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "TOKEN_TTL_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        let port = non_empty("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let metrics_token = non_empty("METRICS_TOKEN");

        let public_metrics = lookup("DEVOPS_PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            authority: AuthorityConfig::new(api_key, signing_secret)
                .with_token_ttl(Duration::seconds(token_ttl_secs)),
            port,
            metrics_token,
            public_metrics,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
