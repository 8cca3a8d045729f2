//! Pulling typed data out of inbound requests.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::Uri;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::validator;

/// Decode a JSON body. Malformed input becomes a 400.
///
/// Unknown fields are ignored unless the target type says
/// `#[serde(deny_unknown_fields)]`.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::bad_request("invalid request body")
    })
}

/// Decode a JSON body, then check that the named fields are non-blank on the
/// decoded value. Names are the JSON names of the fields.
pub fn bind_and_validate<T>(body: &[u8], required: &[&str]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Serialize,
{
    let value: T = parse_json(body)?;

    let decoded = serde_json::to_value(&value).map_err(|e| {
        tracing::error!("Failed to re-serialize decoded body: {}", e);
        ApiError::bad_request("invalid request body")
    })?;
    validator::check_required_fields(&decoded, required).map_err(ApiError::bad_request)?;

    Ok(value)
}

/// Declares which JSON fields must be non-blank for [`Validated`]
pub trait RequiredFields {
    const REQUIRED: &'static [&'static str];
}

/// JSON body extractor that runs [`bind_and_validate`] with `T::REQUIRED`
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Serialize + RequiredFields,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::bad_request("invalid request body"))?;
        bind_and_validate(&body, T::REQUIRED).map(Validated)
    }
}

/// Path segment at `index`, counting from the first segment after the leading
/// slash. Out of range gives `""`.
pub fn path_segment(uri: &Uri, index: usize) -> &str {
    let path = uri.path();
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .nth(index)
        .unwrap_or("")
}

/// Last path segment as an integer id (`/products/123` gives 123)
pub fn id_from_path(uri: &Uri) -> Result<i64, ApiError> {
    uri.path()
        .rsplit('/')
        .next()
        .and_then(|last| last.parse().ok())
        .ok_or_else(|| ApiError::bad_request("invalid id"))
}

/// First value of query parameter `key`, percent-decoded
pub fn query_param(uri: &Uri, key: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Integer query parameter; missing, empty or malformed values give `default`
pub fn query_param_int(uri: &Uri, key: &str, default: i64) -> i64 {
    query_param(uri, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if !validator::is_valid_email(email) {
        return Err(ApiError::bad_request("invalid email format"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct LoginRequest {
        email: String,
        password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Note {
        title: String,
        #[serde(default)]
        body: Option<String>,
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn parse_json_rejects_malformed_body() {
        let err = parse_json::<LoginRequest>(b"{not json").unwrap_err();
        assert_eq!(err.message(), "invalid request body");
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn required_fields_checked_after_decoding() {
        let ok: LoginRequest =
            bind_and_validate(br#"{"email":"a@b.co","password":"pw"}"#, &["email", "password"]).unwrap();
        assert_eq!(ok.email, "a@b.co");

        let err = bind_and_validate::<LoginRequest>(
            br#"{"email":"a@b.co","password":"   "}"#,
            &["email", "password"],
        )
        .unwrap_err();
        assert_eq!(err.message(), "password is required");
    }

    #[test]
    fn first_offending_field_is_reported() {
        let err = bind_and_validate::<LoginRequest>(br#"{"email":"","password":""}"#, &["email", "password"])
            .unwrap_err();
        assert_eq!(err.message(), "email is required");
    }

    #[test]
    fn optional_field_can_be_required() {
        let err = bind_and_validate::<Note>(br#"{"title":"t"}"#, &["title", "body"]).unwrap_err();
        assert_eq!(err.message(), "body is required");

        let note: Note = bind_and_validate(br#"{"title":"t","body":"b"}"#, &["title", "body"]).unwrap();
        assert_eq!(note.body.as_deref(), Some("b"));
    }

    #[test]
    fn path_segments() {
        let u = uri("/products/electronics/123");
        assert_eq!(path_segment(&u, 0), "products");
        assert_eq!(path_segment(&u, 1), "electronics");
        assert_eq!(path_segment(&u, 2), "123");
        assert_eq!(path_segment(&u, 3), "");
    }

    #[test]
    fn id_from_last_segment() {
        assert_eq!(id_from_path(&uri("/products/123")).unwrap(), 123);
        assert!(id_from_path(&uri("/products/abc")).is_err());
        assert!(id_from_path(&uri("/products/123/")).is_err());
    }

    #[test]
    fn query_params() {
        let u = uri("/products?search=laptop%20bag&page=2&bad=x");
        assert_eq!(query_param(&u, "search").as_deref(), Some("laptop bag"));
        assert_eq!(query_param(&u, "missing"), None);
        assert_eq!(query_param_int(&u, "page", 1), 2);
        assert_eq!(query_param_int(&u, "bad", 1), 1);
        assert_eq!(query_param_int(&u, "missing", 7), 7);
        assert_eq!(query_param_int(&uri("/products"), "page", 1), 1);
    }

    #[test]
    fn email_validation_is_a_400() {
        assert!(validate_email("a@b.co").is_ok());
        assert_eq!(validate_email("nope").unwrap_err().message(), "invalid email format");
    }
}
