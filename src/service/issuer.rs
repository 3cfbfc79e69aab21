use log::{info, warn};

use crate::{
    error::{Error, Result},
    mail::{Email, MailGateway},
    model::{
        api::{IssueOutcome, IssueStatus},
        Token,
    },
    storage::{StoreError, TokenStore},
    Config,
};

/// Fresh IDs tried before giving up on repeated secret ID collisions.
const MINT_ATTEMPTS: usize = 3;

/// Return the live token for `email`, minting and persisting one if needed.
///
/// The email must already be trimmed and non-empty.
pub async fn obtain_token(email: &str, tokens: &dyn TokenStore) -> Result<Token> {
    if let Some(token) = tokens.find_by_email(email).await? {
        return Ok(token);
    }

    for _ in 0..MINT_ATTEMPTS {
        let token = Token::new(email);
        match tokens.insert(&token).await {
            Ok(()) => {
                info!("Issued new secret ID for {email}");
                return Ok(token);
            }
            Err(StoreError::Conflict(reason)) => {
                // Either another request issued this address a token first, or
                // the random ID collided. Reuse in the first case, retry in the
                // second.
                if let Some(token) = tokens.find_by_email(email).await? {
                    return Ok(token);
                }
                warn!("Secret ID collision, retrying: {reason}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::Conflict(format!("no free secret ID after {MINT_ATTEMPTS} attempts")).into())
}

/// Issue `email` its secret ID and mail it a login link.
///
/// Repeated calls reuse the live token. If mailing fails the token stays
/// stored and redeemable, and [`Error::MailDelivery`] is returned.
pub async fn issue(
    email: &str,
    tokens: &dyn TokenStore,
    mailer: &dyn MailGateway,
    config: &Config,
) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::validation("Email is required."));
    }

    let token = obtain_token(email, tokens).await?;
    let link = config.login_link(&token.secret_id);
    mailer.send(&Email::voting_link(email, &link)).await?;
    info!("Secure voting link sent to {email}");
    Ok(token.secret_id)
}

/// Store a token with a caller-chosen secret ID, without mailing anything.
pub async fn register(secret_id: &str, email: &str, tokens: &dyn TokenStore) -> Result<Token> {
    let (secret_id, email) = (secret_id.trim(), email.trim());
    if secret_id.is_empty() || email.is_empty() {
        return Err(Error::validation("Secret ID and email are required."));
    }

    let token = Token {
        secret_id: secret_id.to_string(),
        ..Token::new(email)
    };
    match tokens.insert(&token).await {
        Ok(()) => {
            info!("Registered secret ID for {email} by hand");
            Ok(token)
        }
        Err(StoreError::Conflict(_)) => Err(Error::validation(
            "Secret ID or email is already in use.",
        )),
        Err(e) => Err(e.into()),
    }
}

/// Issue every address on the configured mailing list. One address failing
/// never stops the others.
pub async fn issue_all(
    tokens: &dyn TokenStore,
    mailer: &dyn MailGateway,
    config: &Config,
) -> Vec<IssueOutcome> {
    let mut results = Vec::with_capacity(config.mailing_list().len());
    for email in config.mailing_list() {
        let outcome = match issue(email, tokens, mailer, config).await {
            Ok(secret_id) => IssueOutcome {
                email: email.clone(),
                status: IssueStatus::Success,
                secret_id: Some(secret_id),
                error: None,
            },
            Err(e) => {
                warn!("Failed to issue secret ID to {email}: {e}");
                IssueOutcome {
                    email: email.clone(),
                    status: IssueStatus::Failed,
                    secret_id: None,
                    error: Some(e.public_message()),
                }
            }
        };
        results.push(outcome);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mail::Outbox, storage::Stores};

    #[rocket::async_test]
    async fn issue_is_idempotent_until_used() {
        let stores = Stores::memory();
        let outbox = Outbox::default();
        let config = Config::example();

        let first = issue("a@x.com", &*stores.tokens, &outbox, &config).await.unwrap();
        let second = issue("a@x.com", &*stores.tokens, &outbox, &config).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(stores.tokens.list().await.unwrap().len(), 1);

        // Both mails carry the same link.
        let sent = outbox.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
        assert_eq!(outbox.last_secret_id_for("a@x.com"), Some(first));
    }

    #[rocket::async_test]
    async fn empty_email_is_rejected_without_side_effects() {
        let stores = Stores::memory();
        let outbox = Outbox::default();

        for email in ["", "   "] {
            let result = issue(email, &*stores.tokens, &outbox, &Config::example()).await;
            assert!(matches!(result, Err(Error::Validation(_))));
        }
        assert!(stores.tokens.list().await.unwrap().is_empty());
        assert!(outbox.sent().is_empty());
    }

    #[rocket::async_test]
    async fn email_is_trimmed() {
        let stores = Stores::memory();
        let outbox = Outbox::default();
        let config = Config::example();

        let padded = issue(" a@x.com ", &*stores.tokens, &outbox, &config).await.unwrap();
        let plain = issue("a@x.com", &*stores.tokens, &outbox, &config).await.unwrap();
        assert_eq!(padded, plain);
        assert_eq!(outbox.sent()[0].to, "a@x.com");
    }

    #[rocket::async_test]
    async fn mail_failure_keeps_token() {
        let stores = Stores::memory();
        let outbox = Outbox::default();
        outbox.fail_for("a@x.com");

        let result = issue("a@x.com", &*stores.tokens, &outbox, &Config::example()).await;
        assert!(matches!(result, Err(Error::MailDelivery(_))));

        let token = stores.tokens.find_by_email("a@x.com").await.unwrap();
        assert!(token.is_some());
    }

    #[rocket::async_test]
    async fn obtain_reuses_existing_token() {
        let stores = Stores::memory();
        let existing = Token::example();
        stores.tokens.insert(&existing).await.unwrap();

        let token = obtain_token(&existing.email, &*stores.tokens).await.unwrap();
        assert_eq!(token, existing);
    }

    #[rocket::async_test]
    async fn register_stores_chosen_id() {
        let stores = Stores::memory();

        let token = register(" ab12cd34 ", "a@x.com", &*stores.tokens).await.unwrap();
        assert_eq!(token.secret_id, "ab12cd34");
        assert_eq!(stores.tokens.get("ab12cd34").await.unwrap(), Some(token));

        for (id, email) in [("", "b@y.com"), ("00ff00ff", " "), ("ab12cd34", "b@y.com")] {
            let result = register(id, email, &*stores.tokens).await;
            assert!(matches!(result, Err(Error::Validation(_))));
        }
        assert_eq!(stores.tokens.list().await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn bulk_issue_reports_each_address() {
        let stores = Stores::memory();
        let outbox = Outbox::default();
        outbox.fail_for("b@y.com");

        let results = issue_all(&*stores.tokens, &outbox, &Config::example()).await;
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].email, "a@x.com");
        assert_eq!(results[0].status, IssueStatus::Success);
        assert_eq!(
            results[0].secret_id,
            outbox.last_secret_id_for("a@x.com")
        );

        assert_eq!(results[1].email, "b@y.com");
        assert_eq!(results[1].status, IssueStatus::Failed);
        assert_eq!(results[1].secret_id, None);
        assert!(results[1].error.is_some());

        // The failed address still holds a token.
        assert_eq!(stores.tokens.list().await.unwrap().len(), 2);
    }
}
