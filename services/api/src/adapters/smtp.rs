//! services/api/src/adapters/smtp.rs
//!
//! Email delivery through an SMTP relay. Implements the `NotificationChannel`
//! port. A transport is built per message from the settings in effect, since
//! the credentials can change at any time.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use subtrack_core::domain::{non_blank, Notice, Settings};
use subtrack_core::ports::{NotificationChannel, PortError, PortResult};
use tracing::{error, info};

const DEFAULT_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;

/// Everything needed to deliver one email, resolved from `Settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SmtpTarget {
    host: String,
    port: u16,
    user: String,
    password: String,
    from: String,
    to: String,
}

impl SmtpTarget {
    fn resolve(settings: &Settings, recipient: Option<&str>) -> PortResult<Self> {
        let (Some(host), Some(user)) = (non_blank(&settings.smtp_host), non_blank(&settings.smtp_user))
        else {
            return Err(PortError::InvalidInput(
                "SMTP host and user are required".to_string(),
            ));
        };

        let port = non_blank(&settings.smtp_port)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let from = non_blank(&settings.smtp_from).unwrap_or(user);
        let to = recipient
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(user);

        Ok(Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: settings.smtp_pass.clone().unwrap_or_default(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Clone, Default)]
pub struct SmtpAdapter;

impl SmtpAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn mailbox(address: &str) -> PortResult<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| PortError::InvalidInput(format!("Invalid email address '{}': {}", address, e)))
}

#[async_trait]
impl NotificationChannel for SmtpAdapter {
    fn name(&self) -> &'static str {
        "email"
    }

    fn is_configured(&self, settings: &Settings) -> bool {
        settings.smtp_configured()
    }

    async fn send(&self, settings: &Settings, notice: &Notice) -> PortResult<()> {
        let target = SmtpTarget::resolve(settings, notice.recipient.as_deref())?;

        let email = Message::builder()
            .from(mailbox(&target.from)?)
            .to(mailbox(&target.to)?)
            .subject(notice.title.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body.clone())
            .map_err(|e| PortError::InvalidInput(format!("Failed to build email: {}", e)))?;

        let builder = if target.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&target.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&target.host)
        }
        .map_err(|e| PortError::InvalidInput(format!("Invalid SMTP host: {}", e)))?;

        let mailer = builder
            .port(target.port)
            .credentials(Credentials::new(target.user.clone(), target.password.clone()))
            .build();

        mailer.send(email).await.map_err(|e| {
            error!("Email Error: {}", e);
            PortError::Unexpected(format!("Failed to send email: {}", e))
        })?;

        info!("Email sent.");
        Ok(())
    }
}
