//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{AdminPolicy, TelegramVerifier},
    config::AppConfig,
    media::{ImgBbClient, MediaGateway, ObjectStore},
    notify::{Notifier, TelegramBot},
    repositories::{
        UserRepository, card::CardRepository, comment::CommentRepository, vote::VoteRepository,
    },
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub verifier: TelegramVerifier,
    pub admin_policy: AdminPolicy,
    pub user_repository: UserRepository,
    pub card_repository: CardRepository,
    pub vote_repository: VoteRepository,
    pub comment_repository: CommentRepository,
    pub notifier: Notifier,
    pub media: MediaGateway,
}

impl AppState {
    /// Wire repositories and clients from configuration
    pub fn new(
        db_pool: PgPool,
        config: AppConfig,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let bot = TelegramBot::new(&config.telegram_api_url, &config.bot_token);
        let image_host = config.imgbb_api_key().map(ImgBbClient::new);

        Self {
            verifier: TelegramVerifier::new(&config.bot_token),
            admin_policy: AdminPolicy::new(config.admin_ids()),
            user_repository: UserRepository::new(db_pool.clone()),
            card_repository: CardRepository::new(db_pool.clone()),
            vote_repository: VoteRepository::new(db_pool.clone()),
            comment_repository: CommentRepository::new(db_pool.clone()),
            notifier: Notifier::new(bot, config.app_url()),
            media: MediaGateway::new(object_store, image_host),
            config: Arc::new(config),
            db_pool,
        }
    }
}
