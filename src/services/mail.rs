//! Outbound mail for the share-post and contact flows.
//!
//! Delivery is delegated to a [`MailTransport`]. The [`Notifier`] composes
//! the messages and reports only whether the transport accepted them; it
//! never retries.

use crate::config::{MailBackend, MailConfig, SmtpConfig, SmtpSecurity};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub reply_to: Option<String>,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()> {
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "Outgoing mail (log backend):\n{}",
            mail.body
        );
        Ok(())
    }
}

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let builder = match config.security {
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let builder = builder.port(config.port);
        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()> {
        let mut builder = Message::builder()
            .from(
                mail.from
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        if let Some(reply_to) = &mail.reply_to {
            builder = builder.reply_to(
                reply_to
                    .parse()
                    .map_err(|e| anyhow!("Invalid reply-to address: {}", e))?,
            );
        }

        let message = builder
            .body(mail.body.clone())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub sender_name: String,
    pub sender_email: String,
    pub recipient_email: String,
    pub post_title: String,
    pub post_url: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRequest {
    pub sender_name: String,
    pub sender_email: String,
    pub body: String,
}

#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    from: String,
    contact_recipient: String,
}

impl Notifier {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        from: impl Into<String>,
        contact_recipient: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            from: from.into(),
            contact_recipient: contact_recipient.into(),
        }
    }

    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let transport: Arc<dyn MailTransport> = match config.backend {
            MailBackend::Log => Arc::new(LogTransport),
            MailBackend::Smtp => {
                let smtp = config
                    .smtp
                    .as_ref()
                    .ok_or_else(|| anyhow!("mail.backend = \"smtp\" requires a [mail.smtp] section"))?;
                Arc::new(SmtpTransport::from_config(smtp)?)
            }
        };
        Ok(Self::new(
            transport,
            config.from.clone(),
            config.contact_recipient.clone(),
        ))
    }

    pub fn share_mail(&self, request: &ShareRequest) -> OutgoingMail {
        OutgoingMail {
            from: self.from.clone(),
            reply_to: Some(request.sender_email.clone()),
            to: request.recipient_email.clone(),
            subject: format!(
                "{} recommends you read {}",
                request.sender_name, request.post_title
            ),
            body: format!(
                "Read {} at {}\n\n{}'s comments: {}",
                request.post_title,
                request.post_url,
                request.sender_name,
                request.comment.as_deref().unwrap_or("")
            ),
        }
    }

    pub fn contact_mail(&self, request: &ContactRequest) -> OutgoingMail {
        OutgoingMail {
            from: self.from.clone(),
            reply_to: Some(request.sender_email.clone()),
            to: self.contact_recipient.clone(),
            subject: "Blog - Contact Form Submission".to_string(),
            body: format!(
                "Name: {}\nEmail: {}\nMessage:\n{}",
                request.sender_name, request.sender_email, request.body
            ),
        }
    }

    /// Returns whether the message was handed off successfully.
    pub async fn send_share(&self, request: &ShareRequest) -> bool {
        self.dispatch(self.share_mail(request)).await
    }

    pub async fn send_contact(&self, request: &ContactRequest) -> bool {
        self.dispatch(self.contact_mail(request)).await
    }

    async fn dispatch(&self, mail: OutgoingMail) -> bool {
        match self.transport.deliver(&mail).await {
            Ok(()) => {
                tracing::info!(to = %mail.to, subject = %mail.subject, "Mail dispatched");
                true
            }
            Err(e) => {
                tracing::warn!(to = %mail.to, "Mail dispatch failed: {:#}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> Notifier {
        Notifier::new(Arc::new(LogTransport), "blog@example.com", "owner@example.com")
    }

    #[test]
    fn share_mail_is_addressed_to_recipient() {
        let mail = notifier().share_mail(&ShareRequest {
            sender_name: "Ada".to_string(),
            sender_email: "ada@example.com".to_string(),
            recipient_email: "bob@example.com".to_string(),
            post_title: "Hello".to_string(),
            post_url: "http://localhost/blog/2024/1/2/hello/".to_string(),
            comment: Some("Worth a read".to_string()),
        });
        assert_eq!(mail.to, "bob@example.com");
        assert_eq!(mail.from, "blog@example.com");
        assert_eq!(mail.reply_to.as_deref(), Some("ada@example.com"));
        assert_eq!(mail.subject, "Ada recommends you read Hello");
        assert_eq!(
            mail.body,
            "Read Hello at http://localhost/blog/2024/1/2/hello/\n\nAda's comments: Worth a read"
        );
    }

    #[test]
    fn contact_mail_goes_to_site_owner() {
        let mail = notifier().contact_mail(&ContactRequest {
            sender_name: "Ada".to_string(),
            sender_email: "ada@example.com".to_string(),
            body: "Hi there".to_string(),
        });
        assert_eq!(mail.to, "owner@example.com");
        assert_eq!(mail.subject, "Blog - Contact Form Submission");
        assert_eq!(mail.body, "Name: Ada\nEmail: ada@example.com\nMessage:\nHi there");
    }

    #[tokio::test]
    async fn log_backend_always_reports_sent() {
        let sent = notifier()
            .send_contact(&ContactRequest {
                sender_name: "Ada".to_string(),
                sender_email: "ada@example.com".to_string(),
                body: "Hi".to_string(),
            })
            .await;
        assert!(sent);
    }
}
