use axum::http::StatusCode;

/// `GET /healthz`
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// `GET /readyz`. The workers poll on their own schedule, so a running
/// process is ready.
pub async fn readyz() -> StatusCode {
    StatusCode::OK
}
