use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@link.local";

/// Outbound email boundary: `send(to, subject, body) -> bool`. Delivery
/// failure is reported to callers as a plain `false`; they surface a
/// generic "try again later".
pub enum Mailer {
    Smtp(SmtpMailer),
    /// Stand-in when `SMTP_HOST` is unset: logs the mail instead of
    /// sending it, so verification/reset links still show up in dev.
    Log,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build from `SMTP_HOST`/`SMTP_PORT`/`SMTP_FROM`/`SMTP_USER`/
    /// `SMTP_PASSWORD`. Without `SMTP_HOST`, email is not configured and
    /// the logging stand-in is used.
    pub fn from_env() -> Self {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            info!("SMTP_HOST not set, using logging mailer");
            return Mailer::Log;
        };

        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);

        let from: Mailbox = match std::env::var("SMTP_FROM")
            .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.into())
            .parse()
        {
            Ok(from) => from,
            Err(e) => {
                warn!("Invalid SMTP_FROM address, using logging mailer: {}", e);
                return Mailer::Log;
            }
        };

        let mut builder = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host) {
            Ok(builder) => builder.port(port),
            Err(e) => {
                warn!("SMTP relay setup failed, using logging mailer: {}", e);
                return Mailer::Log;
            }
        };

        if let (Ok(user), Ok(password)) =
            (std::env::var("SMTP_USER"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(user, password));
        }

        Mailer::Smtp(SmtpMailer {
            transport: builder.build(),
            from,
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        match self {
            Mailer::Smtp(mailer) => {
                let recipient: Mailbox = match to.parse() {
                    Ok(recipient) => recipient,
                    Err(e) => {
                        warn!("Unparseable recipient address {}: {}", to, e);
                        return false;
                    }
                };

                let message = match Message::builder()
                    .from(mailer.from.clone())
                    .to(recipient)
                    .subject(subject)
                    .body(body.to_string())
                {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Failed to build email: {}", e);
                        return false;
                    }
                };

                match mailer.transport.send(message).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("Email delivery to {} failed: {}", to, e);
                        false
                    }
                }
            }
            Mailer::Log => {
                info!("email to {} [{}]: {}", to, subject, body);
                true
            }
        }
    }
}
