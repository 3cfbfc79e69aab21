use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use super::{Email, MailError, MailGateway};

/// A gateway for tests: records every message and fails on demand.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<Email>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl Outbox {
    /// Every message successfully sent so far.
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    /// Make delivery to `address` fail from now on.
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    /// The secret ID carried by the last link sent to `address`.
    pub fn last_secret_id_for(&self, address: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|email| email.to == address)
            .and_then(|email| {
                let token = email.text.split("?token=").nth(1)?;
                let token = token.split_whitespace().next()?;
                crate::model::transport::reveal(token).ok()
            })
    }
}

#[rocket::async_trait]
impl MailGateway for Outbox {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(MailError::Transport(format!(
                "simulated failure for {}",
                email.to
            )));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
