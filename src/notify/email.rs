use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{AlertMessage, Notifier};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

/// Comma separated list; blanks and unparsable addresses are dropped.
pub fn parse_recipients(raw: &str) -> Vec<Mailbox> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<Mailbox>() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(target: "notify", address = s, error = %e, "ignoring bad recipient");
                None
            }
        })
        .collect()
}

impl EmailNotifier {
    /// `None` unless SMTP credentials, a sender and at least one recipient are set.
    pub fn from_env() -> Option<Self> {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        let host = var("SMTP_HOST")?;
        let user = var("SMTP_USER")?;
        let pass = var("SMTP_PASS")?;
        let from_addr = var("NOTIFY_EMAIL_FROM")?;
        let to = parse_recipients(&var("ALERT_EMAILS")?);
        if to.is_empty() {
            return None;
        }
        match Self::build(&host, user, pass, &from_addr, to) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(target: "notify", error = ?e, "email disabled");
                None
            }
        }
    }

    fn build(host: &str, user: String, pass: String, from: &str, to: Vec<Mailbox>) -> Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .context("invalid SMTP_HOST")?
            .credentials(Credentials::new(user, pass))
            .build();
        let from = from.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        Ok(Self { mailer, from, to })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, msg: &AlertMessage) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(msg.subject.clone());
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        let email = match &msg.html {
            Some(html) => builder
                .header(header::ContentType::TEXT_HTML)
                .body(html.clone()),
            None => builder
                .header(header::ContentType::TEXT_PLAIN)
                .body(msg.text.clone()),
        }
        .context("build email")?;

        self.mailer.send(email).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }

    fn recipients(&self) -> Vec<String> {
        self.to.iter().map(|m| m.email.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_split_and_skip_garbage() {
        let got = parse_recipients(" a@example.com, ,not-an-address,b@example.org ");
        let emails: Vec<String> = got.iter().map(|m| m.email.to_string()).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.org"]);
    }
}
