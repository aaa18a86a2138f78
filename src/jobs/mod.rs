//! Periodic maintenance work run alongside the HTTP server.

mod expiry;
mod welcome;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::mail::Mailer;

pub use expiry::{mark_expired_tasks, notify_expiring, send_expiry_reminders};
pub use welcome::send_welcome_email;

#[derive(Clone)]
pub struct JobContext {
    pub pool: PgPool,
    pub mailer: Arc<dyn Mailer>,
    pub from_email: String,
    pub reminder_window: chrono::Duration,
}

/// Starts the expiry sweep and the reminder mailer on a fixed period.
pub fn spawn_scheduler(ctx: JobContext, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            tracing::debug!("running scheduled jobs");

            mark_expired_tasks(&ctx.pool).await;
            send_expiry_reminders(
                &ctx.pool,
                ctx.mailer.as_ref(),
                &ctx.from_email,
                ctx.reminder_window,
            )
            .await;
        }
    })
}
