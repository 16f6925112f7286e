//! Request extractors
//!
//! JSON and multipart extractors whose rejections render as `AppError`.

use std::collections::HashMap;

use axum::{
    Json, async_trait,
    body::Bytes,
    extract::{FromRef, FromRequest, Multipart, Request, rejection::JsonRejection},
    http::{HeaderMap, header},
};
use serde::de::DeserializeOwned;

use crate::AppState;
use crate::error::AppError;
use crate::storage::{ImageKind, MediaStorage};

/// Field carrying the optional image in upload forms
const IMAGE_FIELD: &str = "image";

/// JSON body extractor that reports malformed bodies as validation errors
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// JSON body that may be left out entirely
///
/// An empty body yields `T::default()`. A non-empty body must be sent as
/// `application/json` and parse as `T`, otherwise the request is a 400.
#[derive(Debug, Clone)]
pub struct OptionalJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_content = has_json_content_type(req.headers());
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        if body.is_empty() {
            return Ok(OptionalJson(T::default()));
        }
        if !json_content {
            return Err(AppError::Validation(
                "Expected request with `Content-Type: application/json`".to_string(),
            ));
        }

        serde_json::from_slice(&body)
            .map(OptionalJson)
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let essence = value.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json")
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Image read from an upload form, validated but not yet stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub kind: ImageKind,
    pub data: Vec<u8>,
}

/// Multipart form with text fields and an optional `image` file
///
/// The image is size-checked while streaming, so oversized uploads are
/// rejected before they are fully buffered.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl UploadForm {
    /// Text value of a field, if present
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Interpret a field as a boolean flag ("true", "1", "on")
    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on"))
            .unwrap_or(false)
    }

    /// Write the image (if any) to storage
    ///
    /// # Returns
    /// Public path of the stored image
    pub async fn store_image(
        &self,
        storage: &MediaStorage,
        prefix: &str,
    ) -> Result<Option<String>, AppError> {
        match &self.image {
            Some(image) => Ok(Some(storage.store(prefix, image.kind, &image.data).await?)),
            None => Ok(None),
        }
    }
}

/// Remove an image stored for a post, comment or reply that was then rejected
pub(super) async fn discard_image(state: &AppState, image: Option<String>) {
    if let Some(image) = image {
        if let Err(error) = state.storage.delete(&image).await {
            tracing::warn!(%error, image = %image, "Failed to discard uploaded image");
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for UploadForm
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let max_bytes = AppState::from_ref(state).storage.max_bytes();
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        let mut form = UploadForm::default();
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
        {
            let field_name = field.name().unwrap_or("").to_string();

            if field_name == IMAGE_FIELD && field.file_name().is_some() {
                // Browsers send an empty part when no file was picked
                if field.file_name() == Some("") {
                    continue;
                }
                let kind = ImageKind::detect(field.content_type(), field.file_name())?;

                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?
                {
                    if bytes.len() + chunk.len() > max_bytes {
                        return Err(AppError::Validation(format!(
                            "File too large: exceeds {} bytes",
                            max_bytes
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }

                if !bytes.is_empty() {
                    form.image = Some(ImageUpload { kind, data: bytes });
                }
            } else {
                let value = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read field {}: {}", field_name, e))
                })?;
                form.fields.insert(field_name, value);
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::ReactRequest;
    use axum::body::Body;

    async fn react_body(content_type: Option<&str>, body: &'static str) -> Result<ReactRequest, AppError> {
        let mut builder = axum::http::Request::post("/api/posts/p1/like");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let req = builder.body(Body::from(body)).unwrap();
        OptionalJson::<ReactRequest>::from_request(req, &())
            .await
            .map(|OptionalJson(value)| value)
    }

    #[tokio::test]
    async fn optional_json_defaults_only_for_empty_body() {
        let empty = react_body(None, "").await.unwrap();
        assert!(empty.reaction_type.is_none());

        let empty_json = react_body(Some("application/json"), "").await.unwrap();
        assert!(empty_json.reaction_type.is_none());

        let wow = react_body(Some("application/json; charset=utf-8"), r#"{"reactionType":"wow"}"#)
            .await
            .unwrap();
        assert_eq!(wow.reaction_type.as_deref(), Some("wow"));
    }

    #[tokio::test]
    async fn optional_json_rejects_malformed_or_mistyped_bodies() {
        for (content_type, body) in [
            (Some("application/json"), r#"{"reactionType":"wow""#),
            (Some("application/json"), r#"{"reactionType":5}"#),
            (Some("application/x-www-form-urlencoded"), "reactionType=angry"),
            (None, r#"{"reactionType":"sad"}"#),
        ] {
            let result = react_body(content_type, body).await;
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "{content_type:?} {body}"
            );
        }
    }

    #[test]
    fn flag_accepts_common_truthy_values() {
        let mut form = UploadForm::default();
        for (value, expected) in [("true", true), ("1", true), ("on", true), ("false", false)] {
            form.fields.insert("isPrivate".to_string(), value.to_string());
            assert_eq!(form.flag("isPrivate"), expected, "{value}");
        }
        assert!(!form.flag("missing"));
    }
}
