use devops_auth::TokenAuthority;

use crate::config::ServiceConfig;

/// Shared application state. One instance is built at startup and handed to
/// every worker through `web::Data`.
pub struct AppState {
    pub authority: TokenAuthority,
    /// Bearer token for /metrics.
    pub metrics_token: Option<Vec<u8>>,
    /// Serve /metrics unauthenticated when no token is set.
    pub public_metrics: bool,
}

impl AppState {
    pub fn new(authority: TokenAuthority) -> Self {
        Self {
            authority,
            metrics_token: None,
            public_metrics: false,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            authority: TokenAuthority::new(config.authority.clone()),
            metrics_token: config
                .metrics_token
                .as_ref()
                .map(|t| t.as_bytes().to_vec()),
            public_metrics: config.public_metrics,
        }
    }
}
