use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::UNPROCESSABLE_ENTITY, message: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::NOT_FOUND, message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<ais_store::StoreError> for ApiError {
    fn from(e: ais_store::StoreError) -> Self {
        use ais_store::StoreError::*;
        match e {
            ClusterNotFound(_) | HostNotFound(_) | InfraEnvNotFound(_) => ApiError::not_found(e.to_string()),
            Conflict { .. } => ApiError::unprocessable(e.to_string()),
            Serialization(_) | Internal(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ais_hostsm::HostSmError> for ApiError {
    fn from(e: ais_hostsm::HostSmError) -> Self {
        use ais_hostsm::HostSmError::*;
        match e {
            Store(inner) => inner.into(),
            Domain(_) | InvalidTransition { .. } | MissingData { .. } => ApiError::unprocessable(e.to_string()),
            RetriesExhausted { .. } => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ais_clustersm::ClusterSmError> for ApiError {
    fn from(e: ais_clustersm::ClusterSmError) -> Self {
        use ais_clustersm::ClusterSmError::*;
        match e {
            Store(inner) => inner.into(),
            InvalidTransition { .. } | NotReady { .. } => ApiError::unprocessable(e.to_string()),
            RetriesExhausted { .. } => ApiError::internal(e.to_string()),
            HostTransition(inner) => inner.into(),
        }
    }
}

impl From<ais_dispatcher::DispatchError> for ApiError {
    fn from(e: ais_dispatcher::DispatchError) -> Self {
        ApiError::internal(e.to_string())
    }
}
