//! Card repository for database operations

use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use crate::{
    models::card::{Card, CardFilter, CardStatus, CardType, NewCard, Pagination, SortOrder, VoteValue},
    repositories::author_from_row,
};

/// Card columns joined with author, live counters and the viewer's vote.
/// The viewer id is bound right after this prefix.
const CARD_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.title, c.description, c.type, c.status, c.images,
           c.rating, c.created_at,
           u.id AS author_id, u.first_name AS author_first_name,
           u.last_name AS author_last_name, u.username AS author_username,
           u.photo_url AS author_photo_url,
           (SELECT COUNT(*) FROM comments cm WHERE cm.card_id = c.id) AS comment_count,
           (SELECT COUNT(*) FROM votes v WHERE v.card_id = c.id AND v.value = 1) AS likes,
           (SELECT COUNT(*) FROM votes v WHERE v.card_id = c.id AND v.value = -1) AS dislikes,
           COALESCE((SELECT v.value FROM votes v WHERE v.card_id = c.id AND v.user_id = "#;

const CARD_FROM: &str = r#"), 0::SMALLINT) AS user_vote
    FROM cards c
    JOIN users u ON u.id = c.user_id"#;

/// Card repository for database operations
#[derive(Clone)]
pub struct CardRepository {
    pool: PgPool,
}

impl CardRepository {
    /// Create a new card repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new card and return it as seen by its author
    pub async fn create(&self, card: &NewCard) -> DatabaseResult<Card> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO cards (user_id, title, description, type, images)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(card.user_id)
        .bind(&card.title)
        .bind(&card.description)
        .bind(card.card_type.as_str())
        .bind(&card.images)
        .fetch_one(&self.pool)
        .await?;

        self.find_by_id(id, Some(card.user_id))
            .await?
            .ok_or_else(|| DatabaseError::Query(sqlx::Error::RowNotFound))
    }

    /// Find a card by ID, annotated with `viewer`'s vote
    pub async fn find_by_id(&self, id: i64, viewer: Option<i64>) -> DatabaseResult<Option<Card>> {
        let mut builder = select_query(viewer);
        builder.push(" WHERE c.id = ").push_bind(id);

        let row = builder.build().fetch_optional(&self.pool).await?;

        row.as_ref().map(card_from_row).transpose()
    }

    pub async fn exists(&self, id: i64) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cards WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Get one page of cards matching `filter`, together with the total match count
    pub async fn list(
        &self,
        filter: &CardFilter,
        sort: SortOrder,
        pagination: Pagination,
        viewer: Option<i64>,
    ) -> DatabaseResult<(Vec<Card>, i64)> {
        let rows = list_query(filter, sort, pagination, viewer)
            .build()
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = count_query(filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let cards = rows
            .iter()
            .map(card_from_row)
            .collect::<DatabaseResult<Vec<_>>>()?;

        Ok((cards, total))
    }

    /// Set the status of a card; returns false when the card does not exist
    pub async fn update_status(&self, id: i64, status: CardStatus) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cards
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a card with its comments and votes in one transaction
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE card_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM votes WHERE card_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

fn select_query(viewer: Option<i64>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(CARD_SELECT);
    builder.push_bind(viewer).push(CARD_FROM);
    builder
}

/// Page query over cards matching `filter`
pub(crate) fn list_query(
    filter: &CardFilter,
    sort: SortOrder,
    pagination: Pagination,
    viewer: Option<i64>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = select_query(viewer);
    push_filters(&mut builder, filter);

    builder.push(match sort {
        SortOrder::Rating => " ORDER BY c.rating DESC, c.created_at DESC, c.id DESC",
        SortOrder::Newest => " ORDER BY c.created_at DESC, c.id DESC",
    });

    builder
        .push(" LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    builder
}

/// Count query sharing the predicate of [`list_query`]
pub(crate) fn count_query(filter: &CardFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM cards c");
    push_filters(&mut builder, filter);
    builder
}

fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, filter: &CardFilter) {
    let mut prefix = " WHERE ";

    if let Some(card_type) = filter.card_type {
        builder.push(prefix).push("c.type = ").push_bind(card_type.as_str());
        prefix = " AND ";
    }

    if let Some(status) = filter.status {
        builder.push(prefix).push("c.status = ").push_bind(status.as_str());
        prefix = " AND ";
    }

    if let Some(query) = &filter.query {
        let pattern = format!("%{}%", escape_like(query));
        builder
            .push(prefix)
            .push("(c.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escape LIKE metacharacters so the pattern matches literally
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn card_from_row(row: &PgRow) -> DatabaseResult<Card> {
    let card_type: String = row.get("type");
    let status: String = row.get("status");
    let user_vote: i16 = row.get("user_vote");

    Ok(Card {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        card_type: card_type
            .parse::<CardType>()
            .map_err(DatabaseError::Decode)?,
        status: status.parse::<CardStatus>().map_err(DatabaseError::Decode)?,
        images: row.get("images"),
        rating: row.get("rating"),
        likes: row.get("likes"),
        dislikes: row.get("dislikes"),
        created_at: row.get("created_at"),
        author: author_from_row(row),
        comment_count: row.get("comment_count"),
        user_vote: VoteValue::try_from(user_vote).map_err(DatabaseError::Decode)?,
    })
}
