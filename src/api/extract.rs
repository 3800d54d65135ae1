//! Request body extraction shared by the account handlers.

use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// A JSON or form-encoded body. An empty body yields `T::default()`, so
/// missing fields are reported by validation instead of the decoder.
#[derive(Debug)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let method = req.method().clone();

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::MalformedBody)?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let media_type = content_type.as_deref().map(media_type).unwrap_or_default();

        if media_type == JSON || media_type.ends_with("+json") {
            let Json(value) = Json::<T>::from_bytes(&bytes).map_err(|_| ApiError::MalformedBody)?;
            return Ok(Self(value));
        }

        if media_type == FORM {
            let req = Request::builder()
                .method(method)
                .header(CONTENT_TYPE, FORM)
                .body(Body::from(bytes))
                .map_err(|_| ApiError::MalformedBody)?;
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|_| ApiError::MalformedBody)?;
            return Ok(Self(value));
        }

        Err(ApiError::UnsupportedMediaType(media_type))
    }
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
