use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Success envelope: `{"success": true, "message": ..., "data": ..., "meta": ...}`.
/// `data` and `meta` are omitted when absent.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize, M: Serialize = Value> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<M>,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with data
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self::with_status(message, data, StatusCode::OK)
    }

    /// 201 Created with data
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(message, data, StatusCode::CREATED)
    }

    pub fn with_status(message: impl Into<String>, data: T, status_code: StatusCode) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta: None,
            status_code: Some(status_code),
        }
    }
}

impl<T: Serialize, M: Serialize> ApiResponse<T, M> {
    /// 200 OK with data and a caller-defined `meta` object (page, per_page, total, ...)
    pub fn paginated(message: impl Into<String>, data: T, meta: M) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta: Some(meta),
            status_code: None,
        }
    }
}

impl ApiResponse<()> {
    /// 204 No Content, empty body
    pub fn no_content() -> Self {
        Self {
            message: String::new(),
            data: None,
            meta: None,
            status_code: Some(StatusCode::NO_CONTENT),
        }
    }

    /// 200 OK carrying only a message
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            meta: None,
            status_code: None,
        }
    }
}

impl<T: Serialize, M: Serialize> ApiResponse<T, M> {
    fn envelope(&self) -> Result<Value, serde_json::Error> {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(true));
        body.insert("message".into(), Value::String(self.message.clone()));

        if let Some(data) = &self.data {
            let data_value = serde_json::to_value(data)?;
            if !data_value.is_null() {
                body.insert("data".into(), data_value);
            }
        }
        if let Some(meta) = &self.meta {
            body.insert("meta".into(), serde_json::to_value(meta)?);
        }

        Ok(Value::Object(body))
    }
}

impl<T: Serialize, M: Serialize> IntoResponse for ApiResponse<T, M> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        // For 204 No Content, return empty response
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }

        match self.envelope() {
            Ok(envelope) => (status, Json(envelope)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
