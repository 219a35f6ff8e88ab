use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Multipart},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::i18n::{t, Lang};
use crate::response::SuccessResult;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub path: String,
}

pub fn uploads_router() -> Router {
    Router::new().route("/uploads/image", post(upload_image))
}

fn extension_of(filename: &str) -> Option<String> {
    FsPath::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

async fn upload_image(
    Extension(config): Extension<Arc<AppConfig>>,
    auth_user: AuthUser,
    lang: Lang,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SuccessResult<UploadResponse>>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let extension = extension_of(&filename)
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| ApiError::BadRequest(t(lang, "FileInValid")))?;

        let is_image = field
            .content_type()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(ApiError::BadRequest(t(lang, "FileInValid")));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let name = format!("{}.{extension}", Uuid::new_v4());
        let target = FsPath::new(&config.upload_dir).join(&name);

        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        info!("user {} uploaded {name}", auth_user.id);

        return Ok((
            StatusCode::CREATED,
            Json(SuccessResult::new(UploadResponse {
                path: format!("uploads/{name}"),
            })),
        ));
    }

    Err(ApiError::validation("file", t(lang, "NotNullValidator")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing() {
        assert_eq!(extension_of("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(extension_of("a.b.webp"), Some("webp".to_string()));
        assert_eq!(extension_of("noext"), None);
    }
}
