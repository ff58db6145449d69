use sqlx::SqlitePool;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::services::balances::{self, BalanceError};

/// Notification that a group's composition or parameters changed and its
/// stored balances are stale
#[derive(Debug, Clone)]
pub struct GroupEvent {
    pub mess_group_id: Uuid,
    pub reason: &'static str,
}

impl GroupEvent {
    pub fn new(mess_group_id: Uuid, reason: &'static str) -> Self {
        Self {
            mess_group_id,
            reason,
        }
    }
}

/// Consume group events and recompute balances until every sender is gone.
/// Domain-level outcomes are expected and only logged; the handler that
/// emitted the event has already answered its caller.
pub async fn run_recalc_worker(pool: SqlitePool, mut rx: UnboundedReceiver<GroupEvent>) {
    log::info!("Balance recalculation worker started");

    while let Some(event) = rx.recv().await {
        match balances::recalculate_balances(&pool, &event.mess_group_id).await {
            Ok(result) => {
                log::info!(
                    "Recalculated balances for mess group {} after {} ({} members)",
                    event.mess_group_id,
                    event.reason,
                    result.members.len()
                );
            }
            Err(BalanceError::GroupNotFound) => {
                log::info!(
                    "Skipped balance recalculation after {}: mess group {} no longer exists",
                    event.reason,
                    event.mess_group_id
                );
            }
            Err(BalanceError::EmptyGroup) => {
                log::info!(
                    "Skipped balance recalculation after {}: mess group {} has no members",
                    event.reason,
                    event.mess_group_id
                );
            }
            Err(e) => {
                log::error!(
                    "Failed to recalculate balances for mess group {}: {}",
                    event.mess_group_id,
                    e
                );
            }
        }
    }

    log::info!("Balance recalculation worker stopped");
}
