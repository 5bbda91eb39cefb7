pub mod dashboard;
pub mod update;
pub mod value;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pulse_common::MetricError;
use pulse_storage::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Every failure a handler can report, mapped to a status in one place.
#[derive(Debug)]
pub enum ApiError {
    Metric(MetricError),
    Storage(StorageError),
    /// Body that is not the JSON shape the endpoint expects.
    Malformed(String),
    /// Request body over the given byte limit.
    BodyTooLarge(usize),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Metric(MetricError::UnsupportedKind(_)) => StatusCode::NOT_IMPLEMENTED,
            // kept as 404 for compatibility with deployed agents
            ApiError::Metric(MetricError::MissingId) => StatusCode::NOT_FOUND,
            ApiError::Metric(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Metric(e) => e.to_string(),
            ApiError::Storage(e) => e.to_string(),
            ApiError::Malformed(msg) => format!("malformed JSON body: {msg}"),
            ApiError::BodyTooLarge(limit) => format!("request body exceeds {limit} bytes"),
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!(error = %self.message(), "Request failed");
        }
    }
}

impl From<MetricError> for ApiError {
    fn from(e: MetricError) -> Self {
        ApiError::Metric(e)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

/// Plain-text rendering for the path-addressed endpoints.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), self.message()).into_response()
    }
}

/// `{"error": "..."}` rendering for the JSON endpoints.
#[derive(Debug)]
pub struct JsonApiError(pub ApiError);

impl From<ApiError> for JsonApiError {
    fn from(e: ApiError) -> Self {
        JsonApiError(e)
    }
}

impl From<MetricError> for JsonApiError {
    fn from(e: MetricError) -> Self {
        JsonApiError(e.into())
    }
}

impl From<StorageError> for JsonApiError {
    fn from(e: StorageError) -> Self {
        JsonApiError(e.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    success: &'a str,
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        self.0.log();
        let body = ErrorBody {
            error: self.0.message(),
        };
        (self.0.status(), Json(body)).into_response()
    }
}

pub fn success_response(msg: &str) -> Response {
    (StatusCode::OK, Json(SuccessBody { success: msg })).into_response()
}

/// Decodes a JSON request body.
///
/// Done by hand instead of with the `Json` extractor so decode failures use
/// the same error body as every other rejection.
pub fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_common::MetricKind;

    #[test]
    fn statuses_follow_error_class() {
        let cases = [
            (ApiError::from(MetricError::UnsupportedKind("x".into())), 501),
            (ApiError::from(MetricError::MissingId), 404),
            (
                ApiError::from(MetricError::Parse {
                    kind: MetricKind::Counter,
                    raw: "x".into(),
                }),
                400,
            ),
            (ApiError::from(MetricError::HashMismatch("a".into())), 400),
            (ApiError::from(MetricError::EmptyBatch), 400),
            (ApiError::from(StorageError::NotFound("a".into())), 404),
            (ApiError::from(StorageError::Unavailable("db".into())), 500),
            (ApiError::Malformed("eof".into()), 400),
            (ApiError::BodyTooLarge(16), 413),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{err:?}");
        }
    }
}
