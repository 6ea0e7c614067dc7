//! HTTP surface for the two dashboards.
//!
//! - `GET /dashboard` and `GET /certificates` need `Authorization: Bearer <session token>`
//! - `GET /public-dashboard/:user_id` is open to anyone holding the identifier

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::dashboard::{self, DashboardError};
use crate::insights::MonthBucket;
use crate::models::{CertificateRecord, Dashboard};
use crate::report::Theme;
use crate::source::{IdentityProvider, RecordSource};

pub struct AppState {
    pub source: Arc<dyn RecordSource>,
    pub identity: Arc<dyn IdentityProvider>,
    pub public_url: String,
    pub bucket: MonthBucket,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("sign in to view your dashboard")]
    Unauthorized,

    #[error("malformed user id: {0}")]
    MalformedOwnerId(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DashboardError> for AppError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::NotSignedIn => AppError::Unauthorized,
            DashboardError::Source(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::MalformedOwnerId(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(ref e) => {
                error!("dashboard request failed: {e:#}");
                return (StatusCode::INTERNAL_SERVER_ERROR, "dashboard unavailable").into_response();
            }
        };

        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(private_dashboard))
        .route("/certificates", get(certificates))
        .route("/public-dashboard/:user_id", get(public_dashboard))
        .with_state(state)
}

pub async fn serve(
    state: SharedState,
    bind: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("dashboard server listening on {bind}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("dashboard server stopped");
    Ok(())
}

pub async fn health() -> impl IntoResponse {
    "OK"
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    Some(token.trim()).filter(|token| !token.is_empty())
}

/// GET /dashboard
pub async fn private_dashboard(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let dashboard = dashboard::load_private(
        state.identity.as_ref(),
        state.source.as_ref(),
        token,
        state.bucket,
    )
    .await?;

    let share_link = dashboard::share_link(&state.public_url, dashboard.owner_id);
    Ok(Json(DashboardResponse {
        theme: Theme::for_audience(dashboard.audience),
        dashboard,
        share_link: Some(share_link),
    }))
}

/// GET /certificates
pub async fn certificates(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<CertificateRecord>>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let gallery =
        dashboard::load_gallery(state.identity.as_ref(), state.source.as_ref(), token).await?;
    Ok(Json(gallery))
}

/// GET /public-dashboard/:user_id
pub async fn public_dashboard(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<DashboardResponse>, AppError> {
    let owner_id = Uuid::parse_str(&user_id).map_err(|_| AppError::MalformedOwnerId(user_id))?;
    let dashboard = dashboard::load_public(state.source.as_ref(), owner_id, state.bucket).await?;

    Ok(Json(DashboardResponse {
        theme: Theme::for_audience(dashboard.audience),
        dashboard,
        share_link: None,
    }))
}
