use std::time::Duration;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use camstep_embedded::Effect;

use crate::errors::ServerError;
use crate::services::{DeviceService, schedule_reboot};

#[derive(Clone)]
pub struct CommandState {
    pub device: DeviceService,
}

/// Every GET that no other route claims lands here; paths outside the command table are 404.
pub async fn dispatch_command(
    State(state): State<CommandState>,
    method: Method,
    uri: Uri,
) -> Result<Response, ServerError> {
    if method != Method::GET {
        return Err(ServerError::NotFound);
    }

    let device = state.device.clone();
    let reply = tokio::task::spawn_blocking(move || device.dispatch(uri.path(), uri.query()))
        .await??
        .ok_or(ServerError::NotFound)?;

    if let Some(Effect::Reboot { delay_ms }) = reply.effect {
        schedule_reboot(state.device.clone(), Duration::from_millis(delay_ms));
    }

    Ok((StatusCode::OK, [(CONTENT_TYPE, reply.content_type)], reply.body).into_response())
}
