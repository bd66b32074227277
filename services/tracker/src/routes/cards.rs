//! Card listing, creation, triage and voting

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::{
    error::{ApiError, ApiResult},
    extract::{AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser, MaybeUser},
    models::card::{
        Card, CardDetailResponse, CardListResponse, CardQuery, CreateCardRequest,
        UpdateStatusRequest, VoteRequest,
    },
    state::AppState,
};

fn card_not_found() -> ApiError {
    ApiError::NotFound("Card not found".to_string())
}

/// List cards with filtering, search and pagination
pub async fn list_cards(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<CardQuery>,
) -> ApiResult<Json<CardListResponse>> {
    let filter = query.filter().map_err(ApiError::BadRequest)?;
    let pagination = query.pagination();

    let (cards, total) = state
        .card_repository
        .list(&filter, query.sort_order(), pagination, viewer.id())
        .await?;

    Ok(Json(CardListResponse::new(cards, total, pagination)))
}

/// Get a card together with its comments
pub async fn get_card(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<CardDetailResponse>> {
    let card = state
        .card_repository
        .find_by_id(id, viewer.id())
        .await?
        .ok_or_else(card_not_found)?;

    // The card is still useful without its discussion
    let comments = state
        .comment_repository
        .list_for_card(id)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to load comments for card {}: {}", id, e);
            Vec::new()
        });

    Ok(Json(CardDetailResponse { card, comments }))
}

/// Create a new card owned by the caller
pub async fn create_card(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CreateCardRequest>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let new_card = payload
        .into_new_card(user.id)
        .map_err(ApiError::BadRequest)?;

    let card = state.card_repository.create(&new_card).await?;
    info!("User {} created card {}", user.id, card.id);

    Ok((StatusCode::CREATED, Json(card)))
}

/// Delete a card with its comments and votes
pub async fn delete_card(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    if !state.card_repository.delete(id).await? {
        return Err(card_not_found());
    }

    info!("Admin {} deleted card {}", admin.id, id);
    Ok(Json(json!({ "ok": true })))
}

/// Change the status of a card and tell its author
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Json<Card>> {
    if !state
        .card_repository
        .update_status(id, payload.status)
        .await?
    {
        return Err(card_not_found());
    }

    let card = state
        .card_repository
        .find_by_id(id, Some(admin.id))
        .await?
        .ok_or_else(card_not_found)?;

    info!(
        "Admin {} set card {} to {}",
        admin.id,
        id,
        payload.status.as_str()
    );
    state
        .notifier
        .notify_status_change(&card, admin.id, payload.status);

    Ok(Json(card))
}

/// Cast, switch or retract the caller's vote
pub async fn vote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<VoteRequest>,
) -> ApiResult<Json<Card>> {
    let change = state
        .vote_repository
        .record(user.id, id, payload.value)
        .await?
        .ok_or_else(card_not_found)?;

    debug!(
        "User {} vote on card {}: {} -> {}",
        user.id, id, change.previous, change.effective
    );

    let card = state
        .card_repository
        .find_by_id(id, Some(user.id))
        .await?
        .ok_or_else(card_not_found)?;

    Ok(Json(card))
}
