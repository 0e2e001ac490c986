//! Delivery of the daily report.
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;
use portfolio_common::{PortfolioError, Report, Result};

use crate::config::SmtpSettings;

/// A fully addressed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn from_report(from: &str, to: &str, report: &Report) -> Self {
        OutgoingMail {
            from: from.to_string(),
            to: to.to_string(),
            subject: report.subject.clone(),
            body: report.body.clone(),
        }
    }
}

/// Anything that can deliver an `OutgoingMail`. Implementations do not retry.
pub trait MailTransport {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// SMTP submission with STARTTLS and login credentials.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let (Some(username), Some(password)) = (&settings.username, &settings.password) else {
            return Err(PortfolioError::Configuration(
                "smtp.username and smtp.password are required to send mail".to_string(),
            ));
        };
        let transport = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| PortfolioError::MailDelivery(format!("cannot reach {}: {e}", settings.host)))?
            .port(settings.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();
        Ok(SmtpMailer { transport })
    }
}

fn build_message(mail: &OutgoingMail) -> Result<Message> {
    let mailbox = |address: &str| {
        address
            .parse::<Mailbox>()
            .map_err(|e| PortfolioError::MailDelivery(format!("invalid address {address:?}: {e}")))
    };
    let mut builder = Message::builder().from(mailbox(&mail.from)?);
    for to in mail.to.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        builder = builder.to(mailbox(to)?);
    }
    builder
        .subject(&mail.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(mail.body.clone())
        .map_err(|e| PortfolioError::MailDelivery(format!("cannot build message: {e}")))
}

impl MailTransport for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = build_message(mail)?;
        self.transport
            .send(&message)
            .map_err(|e| PortfolioError::MailDelivery(e.to_string()))?;
        info!("Report mailed to {}", mail.to);
        Ok(())
    }
}

/// Logs the message instead of sending it (`--dry-run`).
pub struct LogOnly;

impl MailTransport for LogOnly {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        info!("[dry-run] mail from {} to {}: {}\n{}", mail.from, mail.to, mail.subject, mail.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            from: "bot@example.com".to_string(),
            to: to.to_string(),
            subject: "Daily Stock Report For Tuesday, January 2nd".to_string(),
            body: "Daily Stock Report\n\nHave a great day!".to_string(),
        }
    }

    #[test]
    fn builds_plain_text_message() {
        let message = build_message(&mail("me@example.com, spouse@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Daily Stock Report For Tuesday, January 2nd"));
        assert!(raw.contains("me@example.com"));
        assert!(raw.contains("spouse@example.com"));
        assert!(raw.contains("text/plain"));
    }

    #[test]
    fn bad_address_is_a_delivery_error() {
        let err = build_message(&mail("not an address")).unwrap_err();
        assert!(matches!(err, PortfolioError::MailDelivery(_)));
    }

    #[test]
    fn missing_credentials_are_a_configuration_error() {
        let settings = SmtpSettings::default();
        assert!(matches!(SmtpMailer::new(&settings), Err(PortfolioError::Configuration(_))));
    }
}
