mod config;
mod sweep;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    HeaderName, HeaderValue, Method,
    header::{CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
};
use chrono::TimeDelta;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use convene_api::media::R2Presigner;
use convene_api::routes;
use convene_api::sessions::{CookiePolicy, SessionRegistry};
use convene_api::state::AppStateInner;
use convene_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "convene=debug,convene_api=debug,convene_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let ttl = TimeDelta::try_hours(config.session_ttl_hours)
        .ok_or_else(|| anyhow::anyhow!("CONVENE_SESSION_TTL_HOURS is out of range"))?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let sessions = SessionRegistry::new(
        db.clone(),
        ttl,
        CookiePolicy::for_deployment(config.production, config.cross_site, config.cookie_domain.clone()),
    );
    let media = Arc::new(R2Presigner::new(config.r2.clone())?);

    // Housekeeping for expired sessions
    let sweeper = tokio::spawn(sweep::run_sweep_loop(sessions.clone(), config.sweep_interval_secs));

    let state = AppStateInner::new(db, sessions.clone(), media);

    // Single trusted origin; cookies require credentials
    let origin: HeaderValue = config.cors_origin.parse()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let app = routes::router(state)
        .layer(security_header(X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(REFERRER_POLICY, "no-referrer"))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Convene server listening on {}", addr);
    info!(
        "Environment: {}, session TTL {}h, sweep every {}s",
        if config.production { "production" } else { "development" },
        sessions.ttl().num_hours(),
        config.sweep_interval_secs
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    if let Err(e) = sessions.sweep().await {
        warn!("Final session sweep failed: {}", e);
    }
    info!("Shutdown complete");

    Ok(())
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
