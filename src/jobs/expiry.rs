use chrono::Utc;
use sqlx::PgPool;

use crate::mail::{EmailMessage, Mailer};
use crate::routes::task::model::{ExpiringTask, Task, TaskStatus};

/// Marks overdue active tasks as expired. Returns how many were updated.
pub async fn mark_expired_tasks(pool: &PgPool) -> usize {
    tracing::info!("Starting task: mark_expired_tasks");

    let expired = match Task::find_expired(pool, Utc::now()).await {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::error!("An error occurred in mark_expired_tasks: {}", e);
            return 0;
        }
    };
    tracing::info!("Found {} tasks to mark as expired.", expired.len());

    let mut updated = 0;
    for task in expired {
        match Task::update_status(pool, task.id, TaskStatus::Expired).await {
            Ok(()) => {
                updated += 1;
                tracing::info!("Task ID {} marked as expired.", task.id);
            }
            Err(e) => tracing::error!("Failed to mark task ID {} as expired: {}", task.id, e),
        }
    }

    updated
}

/// Emails owners of tasks expiring within `window`. Returns how many were sent.
pub async fn send_expiry_reminders(
    pool: &PgPool,
    mailer: &dyn Mailer,
    from: &str,
    window: chrono::Duration,
) -> usize {
    tracing::info!("Starting task: send_expiry_reminder");

    let now = Utc::now();
    let tasks = match Task::find_expiring_between(pool, now, now + window).await {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::error!("An error occurred in send_expiry_reminder: {}", e);
            return 0;
        }
    };
    tracing::info!("Found {} tasks expiring soon.", tasks.len());

    notify_expiring(mailer, from, &tasks).await
}

/// Sends one reminder per task; a failed delivery does not stop the rest.
pub async fn notify_expiring(mailer: &dyn Mailer, from: &str, tasks: &[ExpiringTask]) -> usize {
    let mut sent = 0;

    for task in tasks {
        let message =
            EmailMessage::expiry_reminder(from, &task.owner_email, &task.title, task.expires_at);
        match mailer.send(&message).await {
            Ok(()) => {
                sent += 1;
                tracing::info!("Reminder sent for task ID {} to {}", task.id, task.owner_email);
            }
            Err(e) => tracing::error!("Failed to send email for task ID {}: {}", task.id, e),
        }
    }

    sent
}
