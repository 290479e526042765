//! Outbound email: verification codes and password reset links.
//!
//! Messages are rendered from Askama HTML and plain-text templates and handed
//! to a [`Mailer`]. Production uses SMTP via lettre; without a relay the
//! [`LogMailer`] writes messages to the log instead.

use std::sync::Mutex;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/verify_email.html")]
struct VerifyEmailHtml<'a> {
    name: &'a str,
    code: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/verify_email.txt")]
struct VerifyEmailText<'a> {
    name: &'a str,
    code: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/reset_password.html")]
struct ResetPasswordHtml<'a> {
    name: &'a str,
    code: &'a str,
    link: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/reset_password.txt")]
struct ResetPasswordText<'a> {
    name: &'a str,
    code: &'a str,
    link: &'a str,
    ttl_minutes: i64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl OutboundEmail {
    /// Email verification message with a code and a one-click link.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn verification(to: &str, name: &str, code: &str, link: &str) -> Result<Self, EmailError> {
        Ok(Self {
            to: to.to_string(),
            subject: "Verify your email address".to_string(),
            text_body: VerifyEmailText { name, code, link }.render()?,
            html_body: VerifyEmailHtml { name, code, link }.render()?,
        })
    }

    /// Password reset message.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn password_reset(
        to: &str,
        name: &str,
        code: &str,
        link: &str,
        ttl_minutes: i64,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            text_body: ResetPasswordText {
                name,
                code,
                link,
                ttl_minutes,
            }
            .render()?,
            html_body: ResetPasswordHtml {
                name,
                code,
                link,
                ttl_minutes,
            }
            .render()?,
        })
    }
}

/// Delivers rendered messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the message cannot be delivered.
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError>;
}

/// SMTP delivery through a STARTTLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig, from_address: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: from_address.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text_body,
            "SMTP not configured, email not sent"
        );
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests to read codes back.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutboundEmail>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    #[must_use]
    pub fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    /// The most recent message sent to `to`.
    #[must_use]
    pub fn last_to(&self, to: &str) -> Option<OutboundEmail> {
        self.outbox().into_iter().rev().find(|email| email.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(email);
        }
        Ok(())
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}
