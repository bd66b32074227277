//! Repositories for database operations

use common::error::DatabaseResult;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::models::{User, UserProfile};

pub mod card;
pub mod comment;
pub mod vote;

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a user after a successful login
    pub async fn upsert(&self, user: &User) -> DatabaseResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, username, photo_url, auth_date, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                photo_url = EXCLUDED.photo_url,
                auth_date = EXCLUDED.auth_date,
                is_admin = EXCLUDED.is_admin
            RETURNING id, first_name, last_name, username, photo_url, auth_date, is_admin
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.photo_url)
        .bind(user.auth_date)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, username, photo_url, auth_date, is_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        username: row.get("username"),
        photo_url: row.get("photo_url"),
        auth_date: row.get("auth_date"),
        is_admin: row.get("is_admin"),
    }
}

/// Author profile selected with the `author_` column prefix
pub(crate) fn author_from_row(row: &PgRow) -> UserProfile {
    UserProfile {
        id: row.get("author_id"),
        first_name: row.get("author_first_name"),
        last_name: row.get("author_last_name"),
        username: row.get("author_username"),
        photo_url: row.get("author_photo_url"),
    }
}
