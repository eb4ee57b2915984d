// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_renderer::ChartRenderer;
use crate::application::clock::{Clock, SystemClock};
use crate::application::dashboard_controller::DashboardController;
use crate::application::dashboard_session::DashboardSession;
use crate::application::data_source::DashboardDataSource;
use crate::infrastructure::config::{load_dashboard_config, DashboardConfig, DataSourceKind};
use crate::infrastructure::forecast_api::ForecastApiSource;
use crate::infrastructure::mock_source::MockDataSource;
use crate::infrastructure::svg_canvas::SvgCanvas;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    chart_hover, chart_svg, dashboard_json, dashboard_page, health_check, refresh,
};

const CHART_WIDTH: u32 = 900;
const CHART_HEIGHT: u32 = 360;

fn build_data_source(
    config: &DashboardConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<dyn DashboardDataSource>> {
    let settings = &config.data_source;
    let source: Arc<dyn DashboardDataSource> = match settings.kind {
        DataSourceKind::Mock => match settings.seed {
            Some(seed) => Arc::new(MockDataSource::seeded(seed, clock)),
            None => Arc::new(MockDataSource::from_entropy(clock)),
        },
        DataSourceKind::Api => {
            let api = settings
                .api
                .clone()
                .ok_or_else(|| anyhow::anyhow!("data_source.kind = \"api\" requires [data_source.api]"))?;
            Arc::new(ForecastApiSource::new(api, clock)?)
        }
    };
    Ok(source)
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/healthz", get(health_check))
        .route("/api/dashboard", get(dashboard_json))
        .route("/api/chart.svg", get(chart_svg))
        .route("/api/chart/hover", get(chart_hover))
        .route("/refresh", post(refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create data source (infrastructure layer)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source = build_data_source(&config, clock.clone())?;
    tracing::info!("Using {:?} data source", config.data_source.kind);

    // Create controller and start the refresh session (application layer)
    let mut controller = DashboardController::new(source, ChartRenderer::default(), clock);
    controller.attach_surface(SvgCanvas::new("forecastChart", CHART_WIDTH, CHART_HEIGHT));
    let session = DashboardSession::start(controller);

    // Build router (presentation layer)
    let state = Arc::new(AppState {
        dashboard: session.handle(),
    });
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting demand dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown().await;
    Ok(())
}
