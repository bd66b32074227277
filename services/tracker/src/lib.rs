//! Feedback tracker service
//!
//! Users sign in with Telegram, file issue and suggestion cards, vote and
//! discuss them; admins triage cards and authors are notified through the
//! Telegram bot.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod media;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod validation;

pub use state::AppState;
