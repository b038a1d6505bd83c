use anyhow::{Context, Result};
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::format::{render, DisplayZone, RenderedMessage};
use super::{Notifier, Reminder};
use crate::config::smtp::SmtpConfig;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    zone: DisplayZone,
}

impl EmailNotifier {
    pub fn new(cfg: &SmtpConfig, zone: DisplayZone) -> Result<Self> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .with_context(|| format!("invalid SMTP_HOST {}", cfg.host))?
            .credentials(creds)
            .build();

        let from = cfg.from.parse().context("invalid EMAIL_ADDRESS")?;
        let to = cfg.to.parse().context("invalid TO_EMAIL")?;

        Ok(Self {
            mailer,
            from,
            to,
            zone,
        })
    }

    fn build(&self, msg: RenderedMessage) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(msg.subject)
            .multipart(MultiPart::alternative_plain_html(msg.text, msg.html))
            .context("build email")
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn deliver(&self, reminder: &Reminder<'_>) -> Result<()> {
        let msg = self.build(render(reminder, &self.zone))?;
        self.mailer.send(msg).await.context("send email")?;
        tracing::info!(to = %self.to, event = %reminder.event.id, "reminder email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
