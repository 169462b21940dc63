use chrono::NaiveDate;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use super::SenderError;
use crate::config::SmtpConfig;
use crate::db::models::StatusRecordDetails;

/// Sends the day's per-client status table as a plain-text mail. Consumes
/// engine output only; a send failure is the caller's to log, never to
/// propagate into the run result.
pub struct SummaryMailer {
    config: SmtpConfig,
}

impl SummaryMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    pub async fn send_summary(
        &self,
        day: NaiveDate,
        records: &[StatusRecordDetails],
    ) -> Result<(), SenderError> {
        let config = self.config.clone();
        let subject = format!("Backup report status for {day}");
        let body = render_summary(day, records);
        tokio::task::spawn_blocking(move || send_blocking(&config, &subject, body))
            .await
            .map_err(|e| SenderError::TaskAborted(e.to_string()))?
    }
}

fn send_blocking(config: &SmtpConfig, subject: &str, body: String) -> Result<(), SenderError> {
    let from: Mailbox = config.from.parse()?;
    let mut builder = Message::builder().from(from).subject(subject);
    for recipient in &config.to {
        builder = builder.to(recipient.parse()?);
    }
    let email = builder.body(body)?;

    let transport = if config.username.is_empty() {
        SmtpTransport::builder_dangerous(&config.host)
            .port(config.port)
            .build()
    } else {
        SmtpTransport::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build()
    };

    transport.send(&email)?;
    info!(recipient_count = config.to.len(), "summary mail sent");
    Ok(())
}

fn render_summary(day: NaiveDate, records: &[StatusRecordDetails]) -> String {
    let mut body = format!("Daily backup report status for {day}\n\n");
    if records.is_empty() {
        body.push_str("No active clients were evaluated.\n");
        return body;
    }
    for record in records {
        let subject = record.matched_subject.as_deref().unwrap_or("-");
        body.push_str(&format!(
            "{:<14} {}  ({subject})\n",
            record.status.as_str(),
            record.client_name
        ));
    }
    body
}
