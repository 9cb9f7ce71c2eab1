//! Parsed inbound mail with memoized delivery diagnostics.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MailConfig;
use crate::error::MailError;
use crate::mail::autoreply::detect_auto_reply;
use crate::mail::dsn::{BounceType, DsnStatus, classify_bounce_status, find_bounce_status};
use crate::mail::headers::HeaderMap;

/// The delivery diagnosis derived from a message's DSN fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BounceResult {
    pub status: Option<DsnStatus>,
    pub is_bounce: bool,
    pub bounce_type: Option<BounceType>,
    pub diagnostic_code: Option<String>,
    /// The message's own date when present, else the time of processing.
    pub timestamp: DateTime<Utc>,
}

/// Compute the bounce diagnosis from extracted delivery-status fields.
///
/// Pure — callers wanting the compute-once contract go through
/// [`ParsedMail::bounce_info`].
pub fn compute_bounce_info(
    headers: &HeaderMap,
    message_date: Option<DateTime<Utc>>,
    fallback: DateTime<Utc>,
) -> BounceResult {
    let status = find_bounce_status(headers);
    let bounce_type = classify_bounce_status(status);
    BounceResult {
        status,
        is_bounce: bounce_type.is_some(),
        bounce_type,
        diagnostic_code: headers.first("Diagnostic-Code").map(String::from),
        timestamp: message_date.unwrap_or(fallback),
    }
}

/// An inbound message reduced to the fields the diagnostics need.
///
/// `bounce_info` and `is_auto_reply` are computed once and cached for the
/// message's lifetime; repeated calls observe the identical result.
pub struct ParsedMail {
    /// Top-level message headers.
    pub headers: HeaderMap,
    /// Fields extracted from `message/delivery-status` parts.
    pub bounce_headers: HeaderMap,
    pub from_address: String,
    pub subject: String,
    /// Parsed `Date:` header, when present and valid.
    pub date: Option<DateTime<Utc>>,
    /// When this message was handed to the parser.
    pub received_at: DateTime<Utc>,
    config: Arc<MailConfig>,
    bounce_info: OnceLock<BounceResult>,
    auto_reply: OnceLock<bool>,
}

impl ParsedMail {
    /// The memoized delivery diagnosis.
    pub fn bounce_info(&self) -> &BounceResult {
        self.bounce_info.get_or_init(|| {
            let info = compute_bounce_info(&self.bounce_headers, self.date, self.received_at);
            debug!(
                is_bounce = info.is_bounce,
                bounce_type = ?info.bounce_type,
                "Computed bounce info"
            );
            info
        })
    }

    /// Memoized auto-reply detection.
    pub fn is_auto_reply(&self) -> bool {
        *self.auto_reply.get_or_init(|| {
            detect_auto_reply(&self.headers, &self.from_address, &self.subject, &self.config)
        })
    }
}

/// Parses raw inbound messages into [`ParsedMail`].
///
/// Wraps `mail_parser` for MIME handling; the classification config is
/// injected here and shared by every message it produces.
pub struct InboundParser {
    config: Arc<MailConfig>,
}

impl InboundParser {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Parse a raw RFC 5322 message.
    pub fn parse(&self, raw: &[u8]) -> Result<ParsedMail, MailError> {
        let message = mail_parser::MessageParser::default()
            .parse(raw)
            .ok_or(MailError::UnsupportedFormat)?;

        let from_address = message
            .from()
            .and_then(|addr| addr.first())
            .and_then(|a| a.address())
            .map(String::from)
            .unwrap_or_default();

        let subject = message.subject().unwrap_or_default().to_string();

        let date = message
            .date()
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));

        Ok(ParsedMail {
            headers: HeaderMap::from_message(&message),
            bounce_headers: HeaderMap::from_delivery_status(&message),
            from_address,
            subject,
            date,
            received_at: Utc::now(),
            config: Arc::clone(&self.config),
            bounce_info: OnceLock::new(),
            auto_reply: OnceLock::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARD_BOUNCE: &str = "From: MAILER-DAEMON@example.org\r\n\
To: sender@example.net\r\n\
Subject: Undelivered Mail Returned to Sender\r\n\
Date: Mon, 10 Feb 2020 10:00:00 +0000\r\n\
Content-Type: multipart/report; report-type=delivery-status; boundary=\"BOUND\"\r\n\
\r\n\
--BOUND\r\n\
Content-Type: text/plain\r\n\
\r\n\
Delivery failed.\r\n\
--BOUND\r\n\
Content-Type: message/delivery-status\r\n\
\r\n\
Reporting-MTA: dns; mail.example.org\r\n\
\r\n\
Final-Recipient: rfc822; user@example.com\r\n\
Action: failed\r\n\
Status: 5.1.1\r\n\
Diagnostic-Code: smtp; 550 User unknown\r\n\
--BOUND--\r\n";

    const PLAIN: &str = "From: clerk@agency.example\r\n\
Subject: Your request\r\n\
Date: Mon, 10 Feb 2020 10:00:00 +0000\r\n\
\r\n\
We received your request.\r\n";

    fn parser() -> InboundParser {
        InboundParser::new(MailConfig::default())
    }

    #[test]
    fn hard_bounce_is_classified() {
        let mail = parser().parse(HARD_BOUNCE.as_bytes()).unwrap();
        let info = mail.bounce_info();
        assert!(info.is_bounce);
        assert_eq!(info.bounce_type, Some(BounceType::Hard));
        assert_eq!(
            info.status,
            Some(DsnStatus {
                class: 5,
                subject: 1,
                detail: 1
            })
        );
        assert_eq!(
            info.diagnostic_code.as_deref(),
            Some("smtp; 550 User unknown")
        );
    }

    #[test]
    fn bounce_timestamp_prefers_message_date() {
        let mail = parser().parse(HARD_BOUNCE.as_bytes()).unwrap();
        let info = mail.bounce_info();
        assert_eq!(info.timestamp, mail.date.unwrap());
        assert_ne!(info.timestamp, mail.received_at);
    }

    #[test]
    fn plain_message_is_not_a_bounce() {
        let mail = parser().parse(PLAIN.as_bytes()).unwrap();
        let info = mail.bounce_info();
        assert!(!info.is_bounce);
        assert!(info.status.is_none());
        assert!(info.diagnostic_code.is_none());
    }

    #[test]
    fn bounce_info_is_memoized() {
        let mail = parser().parse(HARD_BOUNCE.as_bytes()).unwrap();
        let first = mail.bounce_info() as *const BounceResult;
        let second = mail.bounce_info() as *const BounceResult;
        assert_eq!(first, second);
        assert_eq!(mail.bounce_info().timestamp, mail.bounce_info().timestamp);
    }

    #[test]
    fn missing_date_falls_back_to_received_at() {
        let raw = "From: a@example.com\r\nSubject: hi\r\n\r\nhello\r\n";
        let mail = parser().parse(raw.as_bytes()).unwrap();
        assert!(mail.date.is_none());
        assert_eq!(mail.bounce_info().timestamp, mail.received_at);
    }

    #[test]
    fn auto_reply_via_header_marker() {
        let raw = "From: clerk@agency.example\r\n\
Subject: Out of office\r\n\
Auto-Submitted: auto-replied\r\n\
\r\n\
I am away.\r\n";
        let mail = parser().parse(raw.as_bytes()).unwrap();
        assert!(mail.is_auto_reply());
    }

    #[test]
    fn auto_reply_via_injected_subject_pattern() {
        let config = MailConfig::from_patterns(None, Some(r"(?i)abwesenheit")).unwrap();
        let parser = InboundParser::new(config);
        let raw = "From: clerk@agency.example\r\n\
Subject: Abwesenheitsnotiz\r\n\
\r\n\
Bin im Urlaub.\r\n";
        let mail = parser.parse(raw.as_bytes()).unwrap();
        assert!(mail.is_auto_reply());
    }

    #[test]
    fn garbage_input_is_unsupported() {
        assert!(matches!(
            parser().parse(&[]),
            Err(MailError::UnsupportedFormat)
        ));
    }
}
