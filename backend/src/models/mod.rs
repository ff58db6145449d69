use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::services::events::GroupEvent;

pub mod user;
pub mod refresh_token;
pub mod mess_group;
pub mod member;
pub mod membership;
pub mod expense;

pub use user::*;
pub use refresh_token::*;
pub use mess_group::*;
pub use member::*;
pub use membership::*;
pub use expense::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub login_rate_limiter: Arc<RateLimiter>,
    pub recalc_tx: UnboundedSender<GroupEvent>,
}
