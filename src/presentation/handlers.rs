// HTTP request handlers
use crate::application::dashboard_session::SessionError;
use crate::infrastructure::http_response::{
    accepts_brotli, text_response, HTML_CONTENT_TYPE, SVG_CONTENT_TYPE,
};
use crate::presentation::app_state::AppState;
use crate::presentation::payload::DashboardPayload;
use crate::presentation::view::render_dashboard_page;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct HoverQuery {
    pub x: f64,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Full dashboard page
pub async fn dashboard_page(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.dashboard.snapshot();
    let html = match render_dashboard_page(&snapshot) {
        Ok(html) => html,
        Err(e) => {
            tracing::error!("Failed to render dashboard page: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match text_response(html, HTML_CONTENT_TYPE, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Current snapshot as JSON
pub async fn dashboard_json(State(state): State<Arc<AppState>>) -> Json<DashboardPayload> {
    let snapshot = state.dashboard.snapshot();
    Json(DashboardPayload::from_snapshot(&snapshot))
}

/// Current chart as a standalone SVG document
pub async fn chart_svg(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.dashboard.snapshot();
    let Some(svg) = snapshot.chart_svg.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match text_response(svg, SVG_CONTENT_TYPE, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Nearest forecast sample for a pointer position along the chart's x axis
pub async fn chart_hover(
    Query(query): Query<HoverQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let snapshot = state.dashboard.snapshot();
    match snapshot.chart.as_ref().and_then(|chart| chart.hover(query.x)) {
        Some(marker) => Json(marker).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Manual refresh; waits for the cycle, then sends the browser back to the page
pub async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard.refresh().await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(SessionError::Closed) => {
            tracing::warn!("Refresh requested after dashboard session ended");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
