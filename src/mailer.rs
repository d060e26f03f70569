//! Outbound mail seam for password-reset links.
//!
//! The default deployment has no SMTP relay, so [`LogMailer`] writes the
//! reset link to the structured log and operators forward it manually.
//! Swapping a real transport in only requires another [`Mailer`] impl.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("falha ao enviar e-mail: {0}")]
    Send(String),
}

pub trait Mailer: Send + Sync {
    fn send_password_reset(&self, recipient: &str, reset_link: &str) -> Result<(), MailerError>;
}

/// Logs the reset link instead of delivering it.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_password_reset(&self, recipient: &str, reset_link: &str) -> Result<(), MailerError> {
        tracing::info!(%recipient, %reset_link, "password reset link issued");
        Ok(())
    }
}

/// Test mailer that records every message it is asked to send.
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for RecordingMailer {
    fn send_password_reset(&self, recipient: &str, reset_link: &str) -> Result<(), MailerError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((recipient.to_string(), reset_link.to_string()));
        }
        Ok(())
    }
}
