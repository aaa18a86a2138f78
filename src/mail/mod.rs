//! Outgoing email.
//!
//! Messages are built here and handed to a [`Mailer`]. The only transport
//! shipped is [`ConsoleMailer`], which writes every message to the log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to deliver mail to {to}: {reason}")]
    Delivery { to: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn welcome(from: &str, to: &str, name: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Welcome to the To Do List".into(),
            body: format!(
                "Hello {name},\n\nThank you for signing up! We're excited to have you on board.\n\nBest regards,\nThe Team"
            ),
        }
    }

    pub fn expiry_reminder(from: &str, to: &str, title: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Task Expiry Reminder".into(),
            body: format!(
                "Your task '{}' is set to expire at {}.",
                title,
                expires_at.to_rfc3339()
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "--- EMAIL (console) ---\n{}\n--- END EMAIL ---",
            message.body
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Keeps every message; fails for recipients listed in `reject`.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub reject: Vec<String>,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if self.reject.contains(&message.to) {
                return Err(MailError::Delivery {
                    to: message.to.clone(),
                    reason: "mailbox unavailable".into(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}
