use std::sync::Arc;

use config::Config;
use sqlx::PgPool;

use crate::mail::Mailer;

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod mail;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
}
