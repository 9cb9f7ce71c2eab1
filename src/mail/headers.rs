//! Ordered header multimap and delivery-status field extraction.
//!
//! Headers may repeat, so values are kept as an ordered sequence per name.
//! Names are stored case-sensitively as they appear in the message; lookups
//! are exact.

use mail_parser::MimeHeaders;

/// An ordered multimap of header name → raw string values.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`, preserving insertion order.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// All values stored under `name`, in insertion order.
    pub fn get_all<'s, 'n>(&'s self, name: &'n str) -> impl Iterator<Item = &'s str> + use<'s, 'n> {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value stored under `name`, if any.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect the top-level headers of a parsed message.
    ///
    /// Only headers with a textual representation are kept; structured
    /// address headers are handled separately by the parser.
    pub fn from_message(message: &mail_parser::Message) -> Self {
        let mut map = Self::new();
        for header in message.headers() {
            if let Some(text) = header.value().as_text() {
                map.append(header.name(), text);
            }
        }
        map
    }

    /// Extract the per-delivery fields of an RFC 3464 report.
    ///
    /// Walks the MIME parts for `message/delivery-status` content and parses
    /// each body as a sequence of `Field: value` lines (continuation lines
    /// folded). Per-message and per-recipient field groups are flattened into
    /// one map, keeping the order fields appear in.
    pub fn from_delivery_status(message: &mail_parser::Message) -> Self {
        let mut map = Self::new();
        for part in &message.parts {
            let Some(ct) = part.content_type() else {
                continue;
            };
            let is_dsn = ct.ctype().eq_ignore_ascii_case("message")
                && ct
                    .subtype()
                    .is_some_and(|s| s.eq_ignore_ascii_case("delivery-status"));
            if !is_dsn {
                continue;
            }
            if let Ok(text) = std::str::from_utf8(part.contents()) {
                parse_field_block(text, &mut map);
            }
        }
        map
    }
}

/// Parse an RFC822-style field block into the map.
///
/// A line is a continuation of the current field when it starts with
/// whitespace OR carries no colon at all — MIME decoding strips the
/// leading whitespace from folded lines, so the colon test is what
/// actually catches them.
fn parse_field_block(text: &str, map: &mut HeaderMap) {
    let mut current: Option<(String, String)> = None;
    for line in text.lines() {
        if line.is_empty() {
            // Group separator between per-message and per-recipient fields.
            if let Some((name, value)) = current.take() {
                map.append(name, value);
            }
            continue;
        }
        let folded = line.starts_with(' ') || line.starts_with('\t') || !line.contains(':');
        if folded {
            if let Some((_, value)) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = current.take() {
            map.append(name, value);
        }
        if let Some((name, value)) = line.split_once(':') {
            current = Some((name.trim().to_string(), value.trim().to_string()));
        }
    }
    if let Some((name, value)) = current {
        map.append(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    const DSN_MESSAGE: &str = "From: MAILER-DAEMON@example.org\r\n\
To: sender@example.net\r\n\
Subject: Undelivered Mail Returned to Sender\r\n\
Date: Mon, 10 Feb 2020 10:00:00 +0000\r\n\
Content-Type: multipart/report; report-type=delivery-status; boundary=\"BOUND\"\r\n\
\r\n\
--BOUND\r\n\
Content-Type: text/plain\r\n\
\r\n\
Delivery to the following recipient failed permanently.\r\n\
--BOUND\r\n\
Content-Type: message/delivery-status\r\n\
\r\n\
Reporting-MTA: dns; mail.example.org\r\n\
\r\n\
Final-Recipient: rfc822; user@example.com\r\n\
Action: failed\r\n\
Status: 5.1.1\r\n\
Diagnostic-Code: smtp; 550 5.1.1 Recipient address rejected:\r\n\
 User unknown\r\n\
--BOUND--\r\n";

    #[test]
    fn multimap_preserves_order() {
        let mut map = HeaderMap::new();
        map.append("Status", "2.0.0");
        map.append("Status", "5.1.1");
        let values: Vec<_> = map.get_all("Status").collect();
        assert_eq!(values, vec!["2.0.0", "5.1.1"]);
        assert_eq!(map.first("Status"), Some("2.0.0"));
    }

    #[test]
    fn missing_name_yields_nothing() {
        let map = HeaderMap::new();
        assert!(map.first("Status").is_none());
        assert_eq!(map.get_all("Status").count(), 0);
    }

    #[test]
    fn extracts_delivery_status_fields() {
        let message = MessageParser::default()
            .parse(DSN_MESSAGE.as_bytes())
            .unwrap();
        let map = HeaderMap::from_delivery_status(&message);

        assert_eq!(map.first("Reporting-MTA"), Some("dns; mail.example.org"));
        assert_eq!(map.first("Action"), Some("failed"));
        assert_eq!(map.first("Status"), Some("5.1.1"));
    }

    #[test]
    fn folds_continuation_lines() {
        let message = MessageParser::default()
            .parse(DSN_MESSAGE.as_bytes())
            .unwrap();
        let map = HeaderMap::from_delivery_status(&message);

        assert_eq!(
            map.first("Diagnostic-Code"),
            Some("smtp; 550 5.1.1 Recipient address rejected: User unknown")
        );
    }

    #[test]
    fn colonless_line_continues_the_current_field() {
        // MIME decoding strips the fold's leading whitespace before we see it.
        let mut map = HeaderMap::new();
        parse_field_block(
            "Diagnostic-Code: smtp; 550 Recipient address rejected:\nUser unknown\nStatus: 5.1.1\n",
            &mut map,
        );
        assert_eq!(
            map.first("Diagnostic-Code"),
            Some("smtp; 550 Recipient address rejected: User unknown")
        );
        assert_eq!(map.first("Status"), Some("5.1.1"));
    }

    #[test]
    fn plain_message_has_no_delivery_status() {
        let raw = "From: a@example.com\r\nSubject: hi\r\n\r\nhello\r\n";
        let message = MessageParser::default().parse(raw.as_bytes()).unwrap();
        let map = HeaderMap::from_delivery_status(&message);
        assert!(map.is_empty());
    }
}
