use crate::error::MailError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// A message collected by the email dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// SMTP submission with STARTTLS and login credentials.
pub struct SmtpMailer {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, credentials: Option<(&str, &str)>) -> Self {
        Self {
            host: host.to_string(),
            port,
            credentials: credentials.map(|(user, pass)| (user.to_string(), pass.to_string())),
        }
    }
}

/// Rewrites a dictated address ("john at example dot com") into mailbox form.
pub fn spoken_address(raw: &str) -> String {
    let padded = format!(" {} ", raw.trim().to_lowercase());
    padded
        .replace(" at ", "@")
        .replace(" dot ", ".")
        .split_whitespace()
        .collect()
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

/// 530 auth required, 534 mechanism rejected, 535 bad credentials.
fn is_auth_failure(err: &lettre::transport::smtp::Error) -> bool {
    err.status()
        .map(|code| matches!(code.to_string().as_str(), "530" | "534" | "535"))
        .unwrap_or(false)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let (user, pass) = self
            .credentials
            .as_ref()
            .ok_or(MailError::MissingCredentials)?;

        let message = Message::builder()
            .from(parse_mailbox(user)?)
            .to(parse_mailbox(&spoken_address(&email.to))?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(self.port)
            .credentials(Credentials::new(user.clone(), pass.clone()))
            .build();

        match transport.send(message).await {
            Ok(_) => Ok(()),
            Err(e) if is_auth_failure(&e) => Err(MailError::Authentication(e.to_string())),
            Err(e) => Err(MailError::Transport(e.to_string())),
        }
    }
}
