use crate::api::{decode_json, success_response, ApiError, JsonApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Extension, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use pulse_common::{Metric, MetricDto, MetricError, RawValue};

/// `POST /update/{kind}/{id}/{value}`
pub async fn update_path(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    Path((kind, id, value)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let metric = Metric::parse(&id, &kind, Some(RawValue::Text(&value)))?.into_metric()?;
    let stored = state.repository.put(metric).await?;
    state.committed().await?;

    tracing::debug!(
        trace_id = &*trace_id,
        id = %stored.id,
        kind = %stored.kind(),
        value = %stored.value,
        "Metric updated"
    );
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        stored.value.to_string(),
    )
        .into_response())
}

/// Checks one submitted metric: kind, id, value, then hash.
fn accept(state: &AppState, dto: MetricDto) -> Result<Metric, MetricError> {
    let metric = dto.validate()?;
    state.signer.verify(&metric)?;
    Ok(metric)
}

/// `POST /update` with a single JSON metric.
pub async fn update_json(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    body: Bytes,
) -> Result<Response, JsonApiError> {
    let dto: MetricDto = decode_json(&body)?;
    let metric = accept(&state, dto)?;
    let stored = state.repository.put(metric).await?;
    state.committed().await?;

    tracing::debug!(
        trace_id = &*trace_id,
        id = %stored.id,
        kind = %stored.kind(),
        value = %stored.value,
        "Metric updated"
    );
    Ok(success_response("metric updated"))
}

/// `POST /updates` with a JSON array.
///
/// The whole batch is validated before anything is written; the first
/// invalid element rejects all of it.
pub async fn update_batch(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    body: Bytes,
) -> Result<Response, JsonApiError> {
    let batch: Vec<MetricDto> = decode_json(&body)?;
    if batch.is_empty() {
        return Err(MetricError::EmptyBatch.into());
    }
    let metrics = batch
        .into_iter()
        .map(|dto| accept(&state, dto))
        .collect::<Result<Vec<_>, _>>()?;

    let count = metrics.len();
    state.repository.put_batch(metrics).await?;
    state.committed().await?;

    tracing::debug!(trace_id = &*trace_id, count, "Metric batch updated");
    Ok(success_response(&format!("{count} metrics updated")))
}
