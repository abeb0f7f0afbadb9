// src/main.rs

use std::env;

use axum::routing::{get, post};
use axum::Router;
use sqlx::{Pool, Postgres};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod db;
mod engine;
mod models;
mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let pool = db::connect().await?;
    let state = AppState { pool };

    // Very permissive CORS for local dev (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // health
        .route("/health", get(routes::health::health))
        // categories
        .route(
            "/api/categories",
            get(routes::categories::list_categories)
                .post(routes::categories::create_category)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/api/categories/:id",
            get(routes::categories::get_category)
                .put(routes::categories::update_category)
                .delete(routes::categories::delete_category)
                .fallback(routes::method_not_allowed),
        )
        // kpis
        .route(
            "/api/kpis",
            get(routes::kpis::list_kpis)
                .post(routes::kpis::create_kpi)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/api/kpis/:id",
            get(routes::kpis::get_kpi)
                .put(routes::kpis::update_kpi)
                .delete(routes::kpis::delete_kpi)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/api/kpis/:id/stats",
            get(routes::kpis::kpi_stats).fallback(routes::method_not_allowed),
        )
        // metrics
        .route(
            "/api/metrics",
            get(routes::metrics::list_metrics)
                .post(routes::metrics::create_metric)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/api/metrics/bulk",
            post(routes::metrics::bulk_create_metrics).fallback(routes::method_not_allowed),
        )
        .route(
            "/api/metrics/:id",
            get(routes::metrics::get_metric)
                .put(routes::metrics::update_metric)
                .delete(routes::metrics::delete_metric)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/api/metrics/kpi/:kpi_id",
            get(routes::metrics::metrics_by_kpi).fallback(routes::method_not_allowed),
        )
        // dashboard
        .route(
            "/api/dashboard/overview",
            get(routes::dashboard::overview).fallback(routes::method_not_allowed),
        )
        .route(
            "/api/dashboard/trends",
            get(routes::dashboard::trends).fallback(routes::method_not_allowed),
        )
        .route(
            "/api/dashboard/performance",
            get(routes::dashboard::performance_summary).fallback(routes::method_not_allowed),
        )
        // state & middleware
        .fallback(routes::unknown_route)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("API listening on http://{addr}");

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
