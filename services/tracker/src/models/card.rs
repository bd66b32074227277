//! Card, vote and listing models

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::{UserProfile, comment::Comment},
    validation,
};

/// Kind of feedback a card carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    #[default]
    Issue,
    Suggestion,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Issue => "issue",
            CardType::Suggestion => "suggestion",
        }
    }
}

impl FromStr for CardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue" => Ok(CardType::Issue),
            "suggestion" => Ok(CardType::Suggestion),
            other => Err(format!("Invalid card type: {}", other)),
        }
    }
}

/// Triage status, changed by admins only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Open,
    Closed,
    Fixed,
    FixComing,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Open => "open",
            CardStatus::Closed => "closed",
            CardStatus::Fixed => "fixed",
            CardStatus::FixComing => "fix_coming",
        }
    }

    /// Human readable label used in notifications
    pub fn label(&self) -> &'static str {
        match self {
            CardStatus::Open => "Open",
            CardStatus::Closed => "Closed",
            CardStatus::Fixed => "Fixed",
            CardStatus::FixComing => "Fix Coming",
        }
    }
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(CardStatus::Open),
            "closed" => Ok(CardStatus::Closed),
            "fixed" => Ok(CardStatus::Fixed),
            "fix_coming" => Ok(CardStatus::FixComing),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

/// A single user's vote on a card. `Neutral` is never stored: it is the
/// absence of a vote row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum VoteValue {
    Down,
    #[default]
    Neutral,
    Up,
}

impl VoteValue {
    pub fn value(self) -> i16 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }

    /// Value to persist when `requested` is cast over `previous`.
    /// Repeating the current vote retracts it.
    pub fn resolve(previous: VoteValue, requested: VoteValue) -> VoteValue {
        if previous == requested {
            VoteValue::Neutral
        } else {
            requested
        }
    }

    /// Amount the card rating moves when a vote goes from `previous` to `effective`
    pub fn rating_delta(previous: VoteValue, effective: VoteValue) -> i32 {
        i32::from(effective.value()) - i32::from(previous.value())
    }
}

impl TryFrom<i16> for VoteValue {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Neutral),
            1 => Ok(VoteValue::Up),
            other => Err(format!("Invalid vote value: {}", other)),
        }
    }
}

impl From<VoteValue> for i16 {
    fn from(value: VoteValue) -> Self {
        value.value()
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Card as returned by the API, enriched at read time
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub status: CardStatus,
    pub images: Vec<String>,
    pub rating: i32,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub author: UserProfile,
    pub comment_count: i64,
    pub user_vote: VoteValue,
}

/// Validated card ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub card_type: CardType,
    pub images: Vec<String>,
}

/// Request for card creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCardRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub card_type: CardType,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateCardRequest {
    /// Validate the payload and attach the author
    pub fn into_new_card(self, user_id: i64) -> Result<NewCard, String> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        validation::validate_title(&title)?;
        validation::validate_description(&description)?;
        validation::validate_media_urls(&self.images)?;

        Ok(NewCard {
            user_id,
            title,
            description,
            card_type: self.card_type,
            images: self.images,
        })
    }
}

/// Request for an admin status change
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CardStatus,
}

/// Request for casting a vote
#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    pub value: VoteValue,
}

/// Listing sort order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Highest rating first, newest first among equal ratings
    #[default]
    Rating,
    /// Newest first
    Newest,
}

impl SortOrder {
    /// Only `"time"` selects chronological order; anything else sorts by rating
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("time") => SortOrder::Newest,
            _ => SortOrder::Rating,
        }
    }
}

/// Conjunctive listing filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardFilter {
    pub card_type: Option<CardType>,
    pub status: Option<CardStatus>,
    pub query: Option<String>,
}

/// Page window derived from the 1-based `page` and `limit` parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Query parameters for card listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardQuery {
    pub sort: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub status: Option<String>,
    pub query: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl CardQuery {
    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_param(self.sort.as_deref())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    /// Parse the filter parameters; empty values mean "no filter"
    pub fn filter(&self) -> Result<CardFilter, String> {
        let card_type = non_empty(self.card_type.as_deref())
            .map(str::parse::<CardType>)
            .transpose()?;
        let status = non_empty(self.status.as_deref())
            .map(str::parse::<CardStatus>)
            .transpose()?;
        let query = validation::normalize_search_query(self.query.as_deref())?;

        Ok(CardFilter {
            card_type,
            status,
            query,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Response for card listing with pagination
#[derive(Debug, Clone, Serialize)]
pub struct CardListResponse {
    pub cards: Vec<Card>,
    pub total: i64,
    pub has_more: bool,
    pub page: i64,
    pub limit: i64,
}

impl CardListResponse {
    pub fn new(cards: Vec<Card>, total: i64, pagination: Pagination) -> Self {
        let has_more = pagination.offset() + (cards.len() as i64) < total;
        Self {
            cards,
            total,
            has_more,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}

/// Response for a single card with its discussion
#[derive(Debug, Clone, Serialize)]
pub struct CardDetailResponse {
    pub card: Card,
    pub comments: Vec<Comment>,
}
