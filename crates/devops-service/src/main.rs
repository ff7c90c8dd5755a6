use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devops_service::{config::ServiceConfig, routes, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServiceConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            tracing::error!(
                "JWT_SECRET and DEVOPS_API_KEY must both be set; \
                 there is no built-in fallback secret"
            );
            std::process::exit(1);
        }
    };

    if config.metrics_token.is_none() && config.public_metrics {
        tracing::warn!("DEVOPS_PUBLIC_METRICS=true: /metrics endpoint is publicly accessible");
    }

    let port = config.port;
    let state = web::Data::new(AppState::from_config(&config));

    tracing::info!("DevOps microservice listening on port {port}");
    tracing::info!(
        "Token lifetime: {}s",
        state.authority.token_ttl().num_seconds()
    );
    tracing::info!("  POST http://localhost:{port}/DevOps");
    tracing::info!("  GET  http://localhost:{port}/health");
    tracing::info!("  POST http://localhost:{port}/admin/generate-jwt");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
