use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use camstep_embedded::{TEXT_PLAIN, UpdateKind};
use serde::Deserialize;

use crate::errors::ServerError;
use crate::services::{UpdateService, schedule_reboot};

pub const UPDATE_PASSWORD_HEADER: &str = "x-update-password";

#[derive(Clone)]
pub struct UpdateState {
    pub update_service: UpdateService,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuery {
    pub kind: Option<String>,
}

/// Accepts a whole image and restarts the device once it is stored.
pub async fn upload_image(
    State(state): State<UpdateState>,
    Query(query): Query<UpdateQuery>,
    headers: HeaderMap,
    image: Bytes,
) -> Result<impl IntoResponse, ServerError> {
    let kind = UpdateKind::from_query(query.kind.as_deref());
    let password = headers
        .get(UPDATE_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    tracing::info!("update upload: {} ({} bytes)", kind.label(), image.len());

    let service = state.update_service.clone();
    tokio::task::spawn_blocking(move || service.apply(kind, password.as_deref(), &image))
        .await??;

    schedule_reboot(state.update_service.device().clone(), Duration::ZERO);

    Ok(([(CONTENT_TYPE, TEXT_PLAIN)], "OK"))
}
