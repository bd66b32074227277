//! Card discussion

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extract::{AdminUser, ApiJson, ApiPath, AuthUser},
    models::comment::{Comment, CreateCommentRequest},
    state::AppState,
};

/// List the comments of a card, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(card_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    if !state.card_repository.exists(card_id).await? {
        return Err(ApiError::NotFound("Card not found".to_string()));
    }

    let comments = state.comment_repository.list_for_card(card_id).await?;
    Ok(Json(comments))
}

/// Add a comment and tell the card author
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(card_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let new_comment = payload
        .into_new_comment(card_id, user.id)
        .map_err(ApiError::BadRequest)?;

    let card = state
        .card_repository
        .find_by_id(card_id, Some(user.id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))?;

    let comment = state.comment_repository.create(&new_comment).await?;
    info!("User {} commented on card {}", user.id, card_id);

    state.notifier.notify_new_comment(&card, &user, &comment);

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete a comment
pub async fn delete_comment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    if !state.comment_repository.delete(id).await? {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    info!("Admin {} deleted comment {}", admin.id, id);
    Ok(Json(json!({ "ok": true })))
}
