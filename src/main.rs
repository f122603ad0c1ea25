use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use config::AppConfig;
use services::callback_verifier::CallbackVerifier;
use services::payment_service::PaymentService;
use services::phonepe_service::PhonePeService;
use services::token_manager::{SystemClock, TokenManager};
use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env();
    tracing::info!("App config loaded: {}", config.config_info());

    let app_state = match initialize_app_state(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("❌ Failed to initialize services: {:#}", e);
            std::process::exit(1);
        }
    };

    // The refresh task lives as long as the server; shutdown cancels both.
    let shutdown = CancellationToken::new();
    let refresh_task = app_state
        .token_manager
        .spawn_refresh_task(shutdown.clone());

    let app = build_router(app_state);
    start_server(app, &config, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = refresh_task.await {
        tracing::error!("Token refresh task ended abnormally: {}", e);
    }
    tracing::info!("Server stopped");
}

fn initialize_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        // Not fatal: the server runs, every token fetch fails until these are set.
        tracing::error!("❌ Missing required environment variables: {}", missing.join(", "));
    }

    let verifier = if config.callback_verification_enabled() {
        tracing::info!("Callback authorization check enabled");
        CallbackVerifier::new(
            config.callback_username.as_deref(),
            config.callback_password.as_deref(),
        )
    } else {
        tracing::warn!(
            "CALLBACK_USERNAME/CALLBACK_PASSWORD not set, callbacks are accepted without verification"
        );
        CallbackVerifier::disabled()
    };

    tracing::info!("🔧 Initializing PhonePe service ({})", config.phonepe_environment);
    let phonepe = Arc::new(
        PhonePeService::new(config.clone()).context("failed to build PhonePe HTTP client")?,
    );

    let token_manager = TokenManager::new(phonepe.clone(), Arc::new(SystemClock));
    let payment_service =
        PaymentService::new(phonepe, token_manager.clone(), verifier, config.clone());

    Ok(AppState::new(token_manager, payment_service)
        .with_environment(config.phonepe_environment.clone()))
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .nest("/api", routes::payment::payment_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig, shutdown: CancellationToken) {
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!("Invalid HOST '{}' ({}), binding 0.0.0.0", config.host, e);
            SocketAddr::from(([0, 0, 0, 0], config.port))
        }
    };

    tracing::info!("🚀 Server starting on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "PhonePe Payment Server is running!"
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "token_available": state.token_manager.token_status().is_some(),
        "environment": state.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
