use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::routing::{get, post};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::configs::Settings;
use crate::handles::*;
use crate::services::{DeviceService, UpdateService};

/// Largest image `/update` accepts.
pub const MAX_IMAGE_SIZE: usize = 16 * 1024 * 1024;

pub fn create_app(settings: &Arc<Settings>, device: DeviceService) -> Router {
    let assets = Router::new()
        .route("/", get(serve_index))
        .with_state(AssetState {
            index_path: PathBuf::from(&settings.assets.index_path),
        });

    let update = Router::new()
        .route(
            "/update",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE)),
        )
        .with_state(UpdateState {
            update_service: UpdateService::new(device.clone(), settings.update.clone()),
        });

    let commands = Router::new()
        .fallback(dispatch_command)
        .with_state(CommandState { device });

    Router::new()
        .merge(assets)
        .merge(update)
        .merge(commands)
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
}
