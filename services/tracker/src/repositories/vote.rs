//! Vote repository keeping `cards.rating` in step with the vote rows

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;

use crate::models::card::VoteValue;

/// Outcome of a recorded vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    pub previous: VoteValue,
    pub effective: VoteValue,
}

impl VoteChange {
    pub fn rating_delta(&self) -> i32 {
        VoteValue::rating_delta(self.previous, self.effective)
    }
}

/// Vote repository for database operations
#[derive(Clone)]
pub struct VoteRepository {
    pool: PgPool,
}

impl VoteRepository {
    /// Create a new vote repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply `requested` for `user_id` on `card_id`.
    ///
    /// Repeating the stored vote retracts it. The vote row and the card
    /// rating change in one transaction; `None` means the card does not exist.
    pub async fn record(
        &self,
        user_id: i64,
        card_id: i64,
        requested: VoteValue,
    ) -> DatabaseResult<Option<VoteChange>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent votes on the same card
        let card: Option<i64> = sqlx::query_scalar("SELECT id FROM cards WHERE id = $1 FOR UPDATE")
            .bind(card_id)
            .fetch_optional(&mut *tx)
            .await?;

        if card.is_none() {
            return Ok(None);
        }

        let stored: Option<i16> =
            sqlx::query_scalar("SELECT value FROM votes WHERE user_id = $1 AND card_id = $2")
                .bind(user_id)
                .bind(card_id)
                .fetch_optional(&mut *tx)
                .await?;

        let previous = match stored {
            Some(value) => VoteValue::try_from(value).map_err(DatabaseError::Decode)?,
            None => VoteValue::Neutral,
        };
        let change = VoteChange {
            previous,
            effective: VoteValue::resolve(previous, requested),
        };

        if change.effective == VoteValue::Neutral {
            sqlx::query("DELETE FROM votes WHERE user_id = $1 AND card_id = $2")
                .bind(user_id)
                .bind(card_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO votes (user_id, card_id, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, card_id) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(user_id)
            .bind(card_id)
            .bind(change.effective.value())
            .execute(&mut *tx)
            .await?;
        }

        let delta = change.rating_delta();
        if delta != 0 {
            sqlx::query(
                r#"
                UPDATE cards
                SET rating = rating + $1, updated_at = NOW()
                WHERE id = $2
                "#,
            )
            .bind(delta)
            .bind(card_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some(change))
    }
}
