//! Comment repository for database operations

use common::error::DatabaseResult;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    models::comment::{Comment, NewComment},
    repositories::author_from_row,
};

/// Comment repository for database operations
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    /// Create a new comment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new comment and return it with its author
    pub async fn create(&self, comment: &NewComment) -> DatabaseResult<Comment> {
        let row = sqlx::query(
            r#"
            WITH inserted AS (
                INSERT INTO comments (card_id, user_id, content, images)
                VALUES ($1, $2, $3, $4)
                RETURNING id, card_id, user_id, content, images, created_at
            )
            SELECT i.id, i.card_id, i.user_id, i.content, i.images, i.created_at,
                   u.id AS author_id, u.first_name AS author_first_name,
                   u.last_name AS author_last_name, u.username AS author_username,
                   u.photo_url AS author_photo_url
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(comment.card_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(&comment.images)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment_from_row(&row))
    }

    /// Get all comments of a card, oldest first
    pub async fn list_for_card(&self, card_id: i64) -> DatabaseResult<Vec<Comment>> {
        let rows = sqlx::query(
            r#"
            SELECT cm.id, cm.card_id, cm.user_id, cm.content, cm.images, cm.created_at,
                   u.id AS author_id, u.first_name AS author_first_name,
                   u.last_name AS author_last_name, u.username AS author_username,
                   u.photo_url AS author_photo_url
            FROM comments cm
            JOIN users u ON u.id = cm.user_id
            WHERE cm.card_id = $1
            ORDER BY cm.created_at ASC, cm.id ASC
            "#,
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Delete a comment by ID
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        card_id: row.get("card_id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        images: row.get("images"),
        created_at: row.get("created_at"),
        author: author_from_row(row),
    }
}
