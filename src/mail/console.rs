use log::{debug, info};

use super::{Email, MailError, MailGateway};

/// A gateway that writes messages to the log instead of sending them.
/// Intended for local runs without mail credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[rocket::async_trait]
impl MailGateway for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!("Mail to {}: {}", email.to, email.subject);
        debug!("{}", email.text);
        Ok(())
    }
}
