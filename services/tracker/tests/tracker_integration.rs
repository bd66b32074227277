//! Integration tests against a live PostgreSQL at `DATABASE_URL`
//!
//! Run with `cargo test -p tracker -- --ignored`.

use std::path::PathBuf;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use common::database::{DatabaseConfig, init_pool, run_migrations};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use tracker::{
    AppState,
    config::AppConfig,
    models::{
        User,
        card::{CardFilter, CardStatus, CardType, NewCard, Pagination, SortOrder, VoteValue},
        comment::NewComment,
    },
    repositories::{
        UserRepository, card::CardRepository, comment::CommentRepository, vote::VoteRepository,
    },
    routes::create_router,
};

async fn setup() -> PgPool {
    let config = DatabaseConfig::from_env().expect("Failed to read database config");
    let pool = init_pool(&config).await.expect("Failed to connect");
    let migrations = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    run_migrations(&pool, &migrations)
        .await
        .expect("Failed to run migrations");
    pool
}

fn unique_id() -> i64 {
    (Uuid::new_v4().as_u128() & 0x0000_ffff_ffff_ffff) as i64 + 1
}

async fn create_user(pool: &PgPool, is_admin: bool) -> User {
    let user = User {
        id: unique_id(),
        first_name: "Test".to_string(),
        last_name: Some("User".to_string()),
        username: None,
        photo_url: None,
        auth_date: Utc::now(),
        is_admin,
    };
    UserRepository::new(pool.clone())
        .upsert(&user)
        .await
        .expect("Failed to upsert user")
}

fn new_card(user_id: i64, title: &str) -> NewCard {
    NewCard {
        user_id,
        title: title.to_string(),
        description: String::new(),
        card_type: CardType::Issue,
        images: vec![],
    }
}

async fn rating_of(pool: &PgPool, card_id: i64) -> i32 {
    sqlx::query_scalar("SELECT rating FROM cards WHERE id = $1")
        .bind(card_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL at DATABASE_URL"]
async fn test_vote_toggle_keeps_rating_consistent() {
    let pool = setup().await;
    let author = create_user(&pool, false).await;
    let voter = create_user(&pool, false).await;

    let cards = CardRepository::new(pool.clone());
    let votes = VoteRepository::new(pool.clone());
    let card = cards.create(&new_card(author.id, "Toggle")).await.unwrap();
    assert_eq!(card.rating, 0);

    let change = votes.record(voter.id, card.id, VoteValue::Up).await.unwrap().unwrap();
    assert_eq!(change.effective, VoteValue::Up);
    assert_eq!(rating_of(&pool, card.id).await, 1);

    let change = votes.record(voter.id, card.id, VoteValue::Up).await.unwrap().unwrap();
    assert_eq!(change.effective, VoteValue::Neutral);
    assert_eq!(rating_of(&pool, card.id).await, 0);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE card_id = $1")
        .bind(card.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0, "Retracted vote must not leave a row");

    votes.record(voter.id, card.id, VoteValue::Up).await.unwrap();
    votes.record(voter.id, card.id, VoteValue::Down).await.unwrap();
    assert_eq!(rating_of(&pool, card.id).await, -1);

    let seen = cards.find_by_id(card.id, Some(voter.id)).await.unwrap().unwrap();
    assert_eq!(seen.user_vote, VoteValue::Down);
    assert_eq!((seen.likes, seen.dislikes), (0, 1));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL at DATABASE_URL"]
async fn test_vote_on_missing_card_changes_nothing() {
    let pool = setup().await;
    let voter = create_user(&pool, false).await;

    let result = VoteRepository::new(pool.clone())
        .record(voter.id, -1, VoteValue::Up)
        .await
        .unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL at DATABASE_URL"]
async fn test_delete_card_cascades() {
    let pool = setup().await;
    let author = create_user(&pool, false).await;
    let other = create_user(&pool, false).await;

    let cards = CardRepository::new(pool.clone());
    let card = cards.create(&new_card(author.id, "Doomed")).await.unwrap();

    VoteRepository::new(pool.clone())
        .record(other.id, card.id, VoteValue::Up)
        .await
        .unwrap();
    CommentRepository::new(pool.clone())
        .create(&NewComment {
            card_id: card.id,
            user_id: other.id,
            content: "me too".to_string(),
            images: vec![],
        })
        .await
        .unwrap();

    assert!(cards.delete(card.id).await.unwrap());
    assert!(!cards.delete(card.id).await.unwrap());

    let leftovers: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM comments WHERE card_id = $1)
              + (SELECT COUNT(*) FROM votes WHERE card_id = $1)",
    )
    .bind(card.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL at DATABASE_URL"]
async fn test_listing_pagination_and_sort() {
    let pool = setup().await;
    let author = create_user(&pool, false).await;
    let voters = [create_user(&pool, false).await, create_user(&pool, false).await];

    let token = format!("tok{}_%", unique_id());
    let cards = CardRepository::new(pool.clone());
    let votes = VoteRepository::new(pool.clone());

    let mut ids = Vec::new();
    for index in 0..5 {
        let card = cards
            .create(&new_card(author.id, &format!("{} card {}", token, index)))
            .await
            .unwrap();
        ids.push(card.id);
    }
    for voter in &voters {
        votes.record(voter.id, ids[1], VoteValue::Up).await.unwrap();
    }
    votes.record(voters[0].id, ids[3], VoteValue::Down).await.unwrap();

    let filter = CardFilter {
        query: Some(token.to_uppercase()),
        ..Default::default()
    };

    let mut seen = Vec::new();
    for page in 1..=3 {
        let pagination = Pagination::new(Some(page), Some(2));
        let (page_cards, total) = cards
            .list(&filter, SortOrder::Rating, pagination, None)
            .await
            .unwrap();

        assert_eq!(total, 5);
        assert!(pagination.offset() + page_cards.len() as i64 <= total);
        seen.extend(page_cards);
    }

    assert_eq!(seen.len(), 5);
    assert_eq!(seen[0].id, ids[1]);
    assert_eq!(seen[4].id, ids[3]);
    for pair in seen.windows(2) {
        assert!(pair[0].rating >= pair[1].rating);
        if pair[0].rating == pair[1].rating {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    let (newest, _) = cards
        .list(&filter, SortOrder::Newest, Pagination::new(None, None), None)
        .await
        .unwrap();
    assert_eq!(newest[0].id, ids[4]);

    // `_` in the query is a literal, not a single-character wildcard
    let literal = CardFilter {
        query: Some(token.replace("_%", "__")),
        ..Default::default()
    };
    let (_, total) = cards
        .list(&literal, SortOrder::Rating, Pagination::new(None, None), None)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

fn app_config(admin_id: i64) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        bot_token: String::new(),
        bot_username: "tracker_bot".to_string(),
        admin_ids: admin_id.to_string(),
        app_url: String::new(),
        cookie_secure: false,
        cors_origins: String::new(),
        static_dir: "./does-not-exist".to_string(),
        migrations_dir: "./migrations".to_string(),
        imgbb_api_key: String::new(),
        s3_bucket: String::new(),
        s3_region: "us-east-1".to_string(),
        s3_endpoint: String::new(),
        s3_access_key_id: String::new(),
        s3_secret_access_key: String::new(),
        s3_public_url: String::new(),
        telegram_api_url: "https://api.telegram.org".to_string(),
    }
}

async fn call(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user_id: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header(header::COOKIE, format!("session_id={}", id));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL at DATABASE_URL"]
async fn test_end_to_end_card_lifecycle() {
    let pool = setup().await;
    let user1 = create_user(&pool, false).await;
    let user2 = create_user(&pool, false).await;
    let admin = create_user(&pool, false).await;

    let app = create_router(AppState::new(pool.clone(), app_config(admin.id), None));

    let (status, card) = call(
        &app,
        "POST",
        "/api/cards",
        Some(user1.id),
        Some(json!({"title": "Bug A", "type": "issue"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(card["rating"], 0);
    let id = card["id"].as_i64().unwrap();

    let (status, card) = call(
        &app,
        "POST",
        &format!("/api/cards/{}/vote", id),
        Some(user1.id),
        Some(json!({"value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["rating"], 1);
    assert_eq!(card["user_vote"], 1);

    let (_, detail) = call(&app, "GET", &format!("/api/cards/{}", id), Some(user2.id), None).await;
    assert_eq!(detail["card"]["rating"], 1);
    assert_eq!(detail["card"]["user_vote"], 0);

    let (status, _) = call(
        &app,
        "PATCH",
        &format!("/api/cards/{}/status", id),
        Some(user2.id),
        Some(json!({"status": "fixed"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, card) = call(
        &app,
        "PATCH",
        &format!("/api/cards/{}/status", id),
        Some(admin.id),
        Some(json!({"status": "fixed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["status"], CardStatus::Fixed.as_str());

    let (status, me) = call(&app, "GET", "/api/auth/me", Some(admin.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["is_admin"], true);

    let (status, comment) = call(
        &app,
        "POST",
        &format!("/api/cards/{}/comments", id),
        Some(user2.id),
        Some(json!({"content": "Confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"]["id"], user2.id);

    let (status, _) = call(&app, "DELETE", &format!("/api/cards/{}", id), Some(admin.id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", &format!("/api/cards/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/cards/{}/vote", id),
        Some(user1.id),
        Some(json!({"value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
