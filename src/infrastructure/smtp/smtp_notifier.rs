// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Infrastructure adapter sending the daily report over SMTP (STARTTLS).

use crate::config::SmtpConfig;
use crate::domain::errors::{ExportError, Result};
use crate::ports::notification_port::NotificationPort;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

pub struct SmtpNotifier {
    host: String,
    port: u16,
    user: String,
    password: String,
    recipient: String,
}

fn notification_failed(e: impl std::fmt::Display) -> ExportError {
    ExportError::NotificationError(e.to_string())
}

impl SmtpNotifier {
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let required = |v: &Option<String>, name: &str| {
            v.clone().filter(|s| !s.is_empty()).ok_or_else(|| {
                ExportError::ConfigError(format!("smtp.{} is required to send the report", name))
            })
        };
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            user: required(&config.user, "user")?,
            password: required(&config.password, "password")?,
            recipient: required(&config.recipient, "recipient")?,
        })
    }

    pub fn build_message(&self, subject: &str, html_body: &str) -> Result<Message> {
        let from: Mailbox = self.user.parse().map_err(notification_failed)?;
        let to: Mailbox = self.recipient.parse().map_err(notification_failed)?;
        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(notification_failed)
    }
}

impl NotificationPort for SmtpNotifier {
    fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        let message = self.build_message(subject, html_body)?;
        let mailer = SmtpTransport::starttls_relay(&self.host)
            .map_err(notification_failed)?
            .port(self.port)
            .credentials(Credentials::new(self.user.clone(), self.password.clone()))
            .build();
        mailer.send(&message).map_err(notification_failed)?;
        Ok(())
    }
}
