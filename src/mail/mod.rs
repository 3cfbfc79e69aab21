//! Outbound email. The provider sits behind [`MailGateway`] so that the
//! issuing logic never knows which one is configured.

use std::sync::Arc;

use thiserror::Error;

mod console;
#[cfg(test)]
mod outbox;
mod ses;

pub use console::LogMailer;
#[cfg(test)]
pub use outbox::Outbox;
pub use ses::SesMailer;

pub const VOTING_LINK_SUBJECT: &str = "Your Sawty Voting Link";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Could not build message: {0}")]
    Build(String),
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    /// The message carrying a voter's login link.
    pub fn voting_link(to: impl Into<String>, link: &str) -> Self {
        Self {
            to: to.into(),
            subject: VOTING_LINK_SUBJECT.to_string(),
            text: format!(
                "Hello,\n\n\
                 You have been assigned a secure voting link by Sawty.\n\n\
                 Please click the link below to log in and cast your vote:\n\n\
                 {link}\n\n\
                 Please do not share it with anyone.\n\n\
                 Thank you,\n\
                 Sawty Voting Team\n"
            ),
        }
    }
}

/// Something that can deliver an [`Email`].
#[rocket::async_trait]
pub trait MailGateway: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// The configured gateway, held in managed state.
pub type Mailer = Arc<dyn MailGateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voting_link_email_contains_link() {
        let email = Email::voting_link("a@x.com", "https://vote.example/index?token=YWIxMg");
        assert_eq!(email.to, "a@x.com");
        assert_eq!(email.subject, VOTING_LINK_SUBJECT);
        assert!(email
            .text
            .contains("https://vote.example/index?token=YWIxMg"));
    }
}
