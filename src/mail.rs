use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::config::MailConfig;
use crate::error::ApiError;

/// SMTP mailer. Sends run as fire-and-forget background jobs; a failed send
/// is logged and never fails the originating request.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Result<Self, ApiError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| ApiError::Internal(format!("smtp transport: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: format!("{} <{}>", config.display_name, config.from_address),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ApiError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| ApiError::Internal(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| ApiError::Internal(format!("invalid recipient: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| ApiError::Internal(format!("mail build failed: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ApiError::Internal(format!("mail send failed: {e}")))?;

        info!("mail sent to {to}: {subject}");
        Ok(())
    }

    /// Enqueue a send on the runtime and return immediately.
    pub fn send_in_background(&self, to: String, subject: String, html: String) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &html).await {
                error!("background mail to {to} failed: {e}");
            }
        });
    }
}
