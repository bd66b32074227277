//! API models for request and response payloads

use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod card;
pub mod comment;

/// A user as stored after a successful Telegram login
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub auth_date: DateTime<Utc>,
    pub is_admin: bool,
}

impl User {
    /// First and last name joined the way notifications show them
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().filter(|s| !s.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }

    /// Public profile fields embedded in cards and comments
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

/// Author information attached to cards and comments
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Configuration the frontend needs before login
#[derive(Debug, Clone, Serialize)]
pub struct PublicConfig {
    pub bot_username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(last_name: Option<&str>) -> User {
        User {
            id: 7,
            first_name: "Ada".to_string(),
            last_name: last_name.map(str::to_string),
            username: None,
            photo_url: None,
            auth_date: Utc::now(),
            is_admin: false,
        }
    }

    #[test]
    fn display_name_skips_empty_last_name() {
        assert_eq!(user(None).display_name(), "Ada");
        assert_eq!(user(Some("")).display_name(), "Ada");
        assert_eq!(user(Some("Lovelace")).display_name(), "Ada Lovelace");
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let json = serde_json::to_value(user(None).profile()).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7, "first_name": "Ada"}));
    }
}
