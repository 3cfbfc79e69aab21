use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sesv2::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    types::{Body, Content, Destination, EmailContent, Message},
    Client as SesClient,
};

use super::{Email, MailError, MailGateway};

const CHARSET: &str = "UTF-8";

/// Delivery through Amazon SES.
pub struct SesMailer {
    client: SesClient,
    sender: String,
}

impl SesMailer {
    pub fn new(
        region: String,
        access_key_id: String,
        secret_access_key: String,
        sender: String,
    ) -> Self {
        let aws_config = SdkConfig::builder()
            .region(Region::new(region))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "rocket config",
            )))
            .behavior_version(BehaviorVersion::latest())
            .build();
        Self {
            client: SesClient::new(&aws_config),
            sender,
        }
    }
}

fn content(data: &str) -> Result<Content, MailError> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| MailError::Build(e.to_string()))
}

#[rocket::async_trait]
impl MailGateway for SesMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = Message::builder()
            .subject(content(&email.subject)?)
            .body(Body::builder().text(content(&email.text)?).build())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.sender)
            .destination(Destination::builder().to_addresses(&email.to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| MailError::Transport(DisplayErrorContext(e).to_string()))?;
        Ok(())
    }
}
