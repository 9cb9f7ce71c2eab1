//! Auto-reply detection over message headers.

use crate::config::MailConfig;
use crate::mail::headers::HeaderMap;

/// Fixed header markers checked in order. A `None` needle means any value
/// counts; otherwise the value must contain the needle as a substring.
const AUTO_REPLY_HEADERS: &[(&str, Option<&str>)] = &[
    ("X-Autoreply", None),
    ("X-Autorespond", None),
    ("Auto-Submitted", Some("auto-replied")),
];

/// Decide whether a message is an automatic reply.
///
/// Header markers are checked first and short-circuit. The optional
/// configured patterns are then applied to the sender address and the
/// subject line, in that order.
pub fn detect_auto_reply(
    headers: &HeaderMap,
    from_address: &str,
    subject: &str,
    config: &MailConfig,
) -> bool {
    for (name, needle) in AUTO_REPLY_HEADERS {
        for value in headers.get_all(name) {
            match needle {
                None => return true,
                Some(n) if value.contains(n) => return true,
                Some(_) => {}
            }
        }
    }

    if let Some(re) = &config.auto_reply_email_regex
        && re.is_match(from_address)
    {
        return true;
    }

    if let Some(re) = &config.auto_reply_subject_regex
        && re.is_match(subject)
    {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, *value);
        }
        map
    }

    #[test]
    fn x_autoreply_counts_with_any_value() {
        let map = headers(&[("X-Autoreply", "yes")]);
        assert!(detect_auto_reply(
            &map,
            "a@example.com",
            "Re: hi",
            &MailConfig::default()
        ));
    }

    #[test]
    fn x_autorespond_counts_with_any_value() {
        let map = headers(&[("X-Autorespond", "vacation")]);
        assert!(detect_auto_reply(
            &map,
            "a@example.com",
            "hi",
            &MailConfig::default()
        ));
    }

    #[test]
    fn auto_submitted_requires_auto_replied_substring() {
        let yes = headers(&[("Auto-Submitted", "auto-replied; owner-notified")]);
        let no = headers(&[("Auto-Submitted", "no")]);
        let config = MailConfig::default();
        assert!(detect_auto_reply(&yes, "a@example.com", "hi", &config));
        assert!(!detect_auto_reply(&no, "a@example.com", "hi", &config));
    }

    #[test]
    fn email_pattern_matches_sender() {
        let config = MailConfig::from_patterns(Some(r"^autoreply@"), None).unwrap();
        let map = HeaderMap::new();
        assert!(detect_auto_reply(
            &map,
            "autoreply@agency.example",
            "hi",
            &config
        ));
        assert!(!detect_auto_reply(&map, "clerk@agency.example", "hi", &config));
    }

    #[test]
    fn subject_pattern_is_last_resort() {
        let config = MailConfig::from_patterns(None, Some(r"(?i)out of office")).unwrap();
        let map = HeaderMap::new();
        assert!(detect_auto_reply(
            &map,
            "clerk@agency.example",
            "Out of Office until Monday",
            &config
        ));
    }

    #[test]
    fn no_markers_no_patterns_is_not_auto_reply() {
        let map = headers(&[("Subject", "Your request")]);
        assert!(!detect_auto_reply(
            &map,
            "clerk@agency.example",
            "Your request",
            &MailConfig::default()
        ));
    }
}
