//! Telegram login verification and admin policy
//!
//! The Telegram login widget hands the browser a signed assertion. The
//! signature is an HMAC-SHA256 over the sorted `key=value` fields, keyed with
//! the SHA-256 digest of the bot token.

use std::{collections::BTreeMap, collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

/// Assertions older than this many seconds are rejected
pub const AUTH_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Payload produced by the Telegram login widget
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramAuthData {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl TelegramAuthData {
    /// Build the string the widget signed: every present field except `hash`,
    /// sorted by key and joined with newlines
    pub fn data_check_string(&self) -> String {
        let mut fields = BTreeMap::new();
        fields.insert("id", self.id.to_string());
        fields.insert("auth_date", self.auth_date.to_string());

        let optional = [
            ("first_name", Some(&self.first_name)),
            ("last_name", self.last_name.as_ref()),
            ("username", self.username.as_ref()),
            ("photo_url", self.photo_url.as_ref()),
        ];
        for (key, value) in optional {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                fields.insert(key, value.clone());
            }
        }

        fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Time the assertion was issued, if representable
    pub fn auth_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.auth_date, 0)
    }

    /// Turn a verified assertion into the user row to upsert
    pub fn into_user(self, auth_date: DateTime<Utc>, is_admin: bool) -> User {
        User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name.filter(|v| !v.is_empty()),
            username: self.username.filter(|v| !v.is_empty()),
            photo_url: self.photo_url.filter(|v| !v.is_empty()),
            auth_date,
            is_admin,
        }
    }
}

/// Reasons a login assertion is refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Missing hash")]
    MissingHash,

    #[error("Missing user id")]
    MissingId,

    #[error("Authorization data is outdated")]
    Expired,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Verifies login assertions against the bot token
#[derive(Clone)]
pub struct TelegramVerifier {
    secret_key: [u8; 32],
}

impl TelegramVerifier {
    /// Create a new TelegramVerifier for the given bot token
    pub fn new(bot_token: &str) -> Self {
        Self {
            secret_key: Sha256::digest(bot_token.as_bytes()).into(),
        }
    }

    /// Lowercase hex HMAC of a data check string
    pub fn sign(&self, data_check_string: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret_key)
            .expect("HMAC can take key of any size");
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check an assertion as of `now`
    pub fn verify(&self, data: &TelegramAuthData, now: DateTime<Utc>) -> Result<(), VerifyError> {
        if data.hash.is_empty() {
            return Err(VerifyError::MissingHash);
        }

        if data.id == 0 {
            return Err(VerifyError::MissingId);
        }

        if now.timestamp().saturating_sub(data.auth_date) > AUTH_MAX_AGE_SECS {
            return Err(VerifyError::Expired);
        }

        let expected = self.sign(&data.data_check_string());
        if bool::from(expected.as_bytes().ct_eq(data.hash.as_bytes())) {
            Ok(())
        } else {
            Err(VerifyError::InvalidSignature)
        }
    }
}

/// Static allow-list of administrator user ids
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    admin_ids: Arc<HashSet<i64>>,
}

impl AdminPolicy {
    pub fn new(admin_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            admin_ids: Arc::new(admin_ids.into_iter().collect()),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}
