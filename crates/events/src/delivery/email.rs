//! SMTP delivery for notification e-mails.
//!
//! The transport is built once at startup from [`EmailConfig`] and reused
//! for every message; `lettre` pools the underlying connections.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(#[from] lettre::error::Error),
}

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (port 587).
    StartTls,
    /// TLS from the first byte (port 465).
    Implicit,
    /// No TLS. Only for local relays such as MailHog.
    None,
}

impl SmtpSecurity {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "tls" | "implicit" | "ssl" => Self::Implicit,
            "none" | "plain" | "off" => Self::None,
            _ => Self::StartTls,
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::StartTls => 587,
            Self::Implicit => 465,
            Self::None => 25,
        }
    }
}

const DEFAULT_FROM_ADDRESS: &str = "noreply@cortexa.local";
const DEFAULT_FROM_NAME: &str = "Cortexa";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub security: SmtpSecurity,
    pub from_name: String,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Read the SMTP settings, or `None` when `SMTP_HOST` is unset and
    /// e-mail is disabled.
    ///
    /// | Variable        | Default                      |
    /// |-----------------|------------------------------|
    /// | `SMTP_HOST`     | unset (delivery disabled)    |
    /// | `SMTP_SECURITY` | `starttls` (`tls`, `none`)   |
    /// | `SMTP_PORT`     | 587 / 465 / 25 by security   |
    /// | `SMTP_FROM`     | `noreply@cortexa.local`      |
    /// | `SMTP_FROM_NAME`| `Cortexa`                    |
    /// | `SMTP_USER`     | unset                        |
    /// | `SMTP_PASSWORD` | unset                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty())?;
        let security = std::env::var("SMTP_SECURITY")
            .map(|v| SmtpSecurity::parse(&v))
            .unwrap_or(SmtpSecurity::StartTls);
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| security.default_port()),
            security,
            from_name: std::env::var("SMTP_FROM_NAME")
                .unwrap_or_else(|_| DEFAULT_FROM_NAME.to_string()),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// A rendered plain-text e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct EmailDelivery {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Validate the sender and build the transport. Fails on a malformed
    /// sender address or relay host, not on an unreachable server.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let from = Mailbox::new(Some(config.from_name.clone()), config.from_address.parse()?);

        let mut builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            }
            SmtpSecurity::Implicit => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            }
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
        }
        .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message, EmailError> {
        Ok(Message::builder()
            .from(self.from.clone())
            .to(message.to.parse()?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?)
    }

    pub async fn deliver(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = self.build(message)?;
        self.transport.send(email).await?;
        tracing::info!(to = %message.to, subject = %message.subject, "Notification email sent");
        Ok(())
    }
}
