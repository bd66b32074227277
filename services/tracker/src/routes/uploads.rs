//! Attachment uploads

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    routing::post,
};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extract::AuthUser,
    media::{ImageUploadResult, MAX_FILE_SIZE, MAX_IMAGE_SIZE, UploadError, UploadResult},
    state::AppState,
};

/// Headroom for multipart boundaries and headers on top of the file ceiling
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/upload/image", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + MULTIPART_OVERHEAD))
}

struct UploadedField {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Read the first field called `name`, failing once it grows past `limit`
async fn read_field(
    multipart: &mut Multipart,
    name: &'static str,
    limit: usize,
) -> ApiResult<UploadedField> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(name) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            if data.len() + chunk.len() > limit {
                return Err(UploadError::TooLarge(limit).into());
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(UploadedField {
            filename,
            content_type,
            data,
        });
    }

    Err(UploadError::MissingField(name).into())
}

/// Store a file in object storage
pub async fn upload_file(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResult>> {
    let mut multipart = multipart?;
    let field = read_field(&mut multipart, "file", MAX_FILE_SIZE).await?;

    let result = state
        .media
        .upload_file(&field.filename, field.content_type.as_deref(), field.data)
        .await?;

    info!("User {} uploaded {}", user.id, result.url);
    Ok(Json(result))
}

/// Send an image to the image host
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ImageUploadResult>> {
    let mut multipart = multipart?;
    let field = read_field(&mut multipart, "image", MAX_IMAGE_SIZE).await?;

    let result = state.media.upload_image(field.data).await?;

    info!("User {} uploaded image {}", user.id, result.url);
    Ok(Json(result))
}
