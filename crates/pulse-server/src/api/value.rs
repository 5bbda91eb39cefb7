use crate::api::{decode_json, ApiError, JsonApiError};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use pulse_common::{Metric, MetricDto, MetricKind};
use pulse_storage::StorageError;

/// Stored metric `id`, provided it has the requested kind.
async fn lookup(state: &AppState, kind: MetricKind, id: &str) -> Result<Metric, ApiError> {
    let stored = state.repository.get(id).await?;
    if stored.kind() != kind {
        return Err(StorageError::NotFound(id.to_string()).into());
    }
    Ok(stored)
}

/// `GET /value/{kind}/{id}`: the bare value as text.
pub async fn value_path(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: MetricKind = kind.parse()?;
    let stored = lookup(&state, kind, &id).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        stored.value.to_string(),
    ))
}

/// `POST /value` with `{"id", "type"}`: the full metric, freshly signed.
pub async fn value_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Metric>, JsonApiError> {
    let dto: MetricDto = decode_json(&body)?;
    let kind = dto.lookup_kind()?;
    let stored = lookup(&state, kind, &dto.id).await?;
    Ok(Json(state.signer.signed(stored)))
}
