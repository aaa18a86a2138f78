use std::sync::Arc;

use crate::mail::{EmailMessage, Mailer};

pub async fn send_welcome_email(mailer: Arc<dyn Mailer>, from: String, to: String, name: String) {
    let message = EmailMessage::welcome(&from, &to, &name);

    if let Err(e) = mailer.send(&message).await {
        tracing::error!("Failed to send welcome email to {}: {}", to, e);
    }
}
