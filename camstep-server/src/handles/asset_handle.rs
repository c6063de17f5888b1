use std::path::PathBuf;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use camstep_embedded::TEXT_HTML;

use crate::errors::ServerError;

#[derive(Clone)]
pub struct AssetState {
    pub index_path: PathBuf,
}

pub async fn serve_index(State(state): State<AssetState>) -> Result<impl IntoResponse, ServerError> {
    let page = tokio::fs::read(&state.index_path).await.map_err(|e| {
        tracing::warn!("failed to read {:?}: {}", state.index_path, e);
        ServerError::NotFound
    })?;

    Ok(([(CONTENT_TYPE, TEXT_HTML)], page))
}
