use crate::transport::http::types::{AppState, HealthResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy (store reachable)", body = HealthResponse),
        (status = 503, description = "Service is unhealthy (DB unreachable)", body = HealthResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    let network = state.service.ledger().network().to_string();
    let Some(db) = state.db.as_ref() else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
                store: "memory".into(),
                network,
                error: None,
            }),
        );
    };

    match db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
                store: "postgres".into(),
                network,
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy".into(),
                store: "postgres".into(),
                network,
                error: Some(format!("DB ping failed: {}", e)),
            }),
        ),
    }
}
