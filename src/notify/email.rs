use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use super::{Channel, NotifyError, Result};

const SUBJECT: &str = "New game keys found";
/// Port using implicit TLS; anything else negotiates STARTTLS
const SMTPS_PORT: u16 = 465;

/// SMTP email delivery
pub struct EmailChannel {
    server: String,
    port: u16,
    sender: String,
    password: String,
    recipient: String,
    timeout: Duration,
}

impl EmailChannel {
    pub fn new(
        server: String,
        port: u16,
        sender: String,
        password: String,
        recipient: String,
        timeout: Duration,
    ) -> Self {
        Self {
            server,
            port,
            sender,
            password,
            recipient,
            timeout,
        }
    }

    fn build_message(&self, body: &str) -> Result<Message> {
        Message::builder()
            .from(
                self.sender
                    .parse()
                    .map_err(|e| NotifyError::InvalidAddress(format!("from {}: {}", self.sender, e)))?,
            )
            .to(self
                .recipient
                .parse()
                .map_err(|e| NotifyError::InvalidAddress(format!("to {}: {}", self.recipient, e)))?)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Smtp(format!("Failed to build message: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if self.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.server)
        }
        .map_err(|e| NotifyError::Smtp(format!("SMTP relay error: {}", e)))?;

        let credentials = Credentials::new(self.sender.clone(), self.password.clone());

        Ok(builder
            .port(self.port)
            .credentials(credentials)
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        let email = self.build_message(message)?;
        self.transport()?
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(format!("SMTP send failed: {}", e)))?;
        Ok(())
    }
}
