use crate::config::Settings;
use crate::notify::Notifier;
use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub const SUBJECT_PREFIX: &str = "📢 股票申購通知";

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    receiver: Mailbox,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

impl EmailNotifier {
    /// `Ok(None)` when any of sender, password or receiver is not configured.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let (Some(sender), Some(password), Some(receiver)) = (
            settings.email_sender.as_deref(),
            settings.email_password.as_deref(),
            settings.email_receiver.as_deref(),
        ) else {
            tracing::info!("EMAIL_SENDER/EMAIL_PASSWORD/EMAIL_RECEIVER not all set; email transport disabled");
            return Ok(None);
        };

        let sender_box: Mailbox = sender
            .parse()
            .with_context(|| format!("EMAIL_SENDER is not a valid address: {sender}"))?;
        let receiver_box: Mailbox = receiver
            .parse()
            .with_context(|| format!("EMAIL_RECEIVER is not a valid address: {receiver}"))?;

        // STARTTLS submission; lettre sends QUIT when the connection is dropped.
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
            .with_context(|| format!("failed to configure SMTP relay {}", settings.smtp_host))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();

        Ok(Some(Self {
            transport,
            sender: sender_box,
            receiver: receiver_box,
        }))
    }

    fn build_message(&self, body: &str, subject: &str) -> anyhow::Result<Message> {
        Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build email message")
    }
}

pub fn subject_for(date: chrono::NaiveDate) -> String {
    format!("{SUBJECT_PREFIX} {date}")
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    fn transport(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, message: &str) -> anyhow::Result<()> {
        let date = crate::time::tw_market::local_date(chrono::Utc::now())?;
        let email = self.build_message(message, &subject_for(date))?;
        self.transport
            .send(email)
            .await
            .context("SMTP send failed")?;
        Ok(())
    }
}
