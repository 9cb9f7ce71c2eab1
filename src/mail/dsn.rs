//! RFC 3463 enhanced status codes and bounce classification.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::mail::headers::HeaderMap;

static BOUNCE_STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d)\.(\d+)\.(\d+)").unwrap());

/// An RFC 3463 enhanced status triple parsed from a `Status: D.DD.DD` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsnStatus {
    pub class: u8,
    pub subject: u16,
    pub detail: u16,
}

/// 5.2.2 — mailbox full. Permanent class, but expected to resolve itself.
pub const MAILBOX_FULL: DsnStatus = DsnStatus {
    class: 5,
    subject: 2,
    detail: 2,
};

/// Whether the sender should retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BounceType {
    /// Transient failure, retry later.
    Soft,
    /// Permanent failure, stop retrying.
    Hard,
}

/// Find the first well-formed DSN status among the `Status` field values.
///
/// Values failing the `D.DD.DD` pattern are skipped, not errors.
pub fn find_bounce_status(headers: &HeaderMap) -> Option<DsnStatus> {
    for value in headers.get_all("Status") {
        let Some(caps) = BOUNCE_STATUS_RE.captures(value.trim()) else {
            continue;
        };
        let (Ok(class), Ok(subject), Ok(detail)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse())
        else {
            continue;
        };
        return Some(DsnStatus {
            class,
            subject,
            detail,
        });
    }
    None
}

/// Classify a DSN status as a soft or hard bounce.
///
/// Class 2 is success, class 4 is transient. Class 5 is permanent, except
/// mailbox-full which is treated as transient. Other classes are not
/// recognized as bounces.
pub fn classify_bounce_status(status: Option<DsnStatus>) -> Option<BounceType> {
    let status = status?;
    match status {
        DsnStatus { class: 2, .. } => None,
        DsnStatus { class: 4, .. } => Some(BounceType::Soft),
        s if s == MAILBOX_FULL => Some(BounceType::Soft),
        DsnStatus { class: 5, .. } => Some(BounceType::Hard),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_map(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append("Status", *v);
        }
        map
    }

    #[test]
    fn parses_first_well_formed_status() {
        let map = status_map(&["not-a-code", " 5.1.1 ", "4.0.0"]);
        assert_eq!(
            find_bounce_status(&map),
            Some(DsnStatus {
                class: 5,
                subject: 1,
                detail: 1
            })
        );
    }

    #[test]
    fn no_status_header_yields_none() {
        assert!(find_bounce_status(&HeaderMap::new()).is_none());
    }

    #[test]
    fn all_malformed_yields_none() {
        let map = status_map(&["failed", "5.x.1", ""]);
        assert!(find_bounce_status(&map).is_none());
    }

    #[test]
    fn success_class_is_not_a_bounce() {
        let status = find_bounce_status(&status_map(&["2.0.0"]));
        assert_eq!(classify_bounce_status(status), None);
    }

    #[test]
    fn transient_class_is_soft() {
        let status = find_bounce_status(&status_map(&["4.4.1"]));
        assert_eq!(classify_bounce_status(status), Some(BounceType::Soft));
    }

    #[test]
    fn mailbox_full_is_soft_despite_class_5() {
        let status = find_bounce_status(&status_map(&["5.2.2"]));
        assert_eq!(classify_bounce_status(status), Some(BounceType::Soft));
    }

    #[test]
    fn permanent_class_is_hard() {
        let status = find_bounce_status(&status_map(&["5.1.1"]));
        assert_eq!(classify_bounce_status(status), Some(BounceType::Hard));
    }

    #[test]
    fn unrecognized_classes_are_not_bounces() {
        for class in ["0.0.0", "1.2.3", "3.1.1", "6.0.0", "9.9.9"] {
            let status = find_bounce_status(&status_map(&[class]));
            assert_eq!(classify_bounce_status(status), None, "class {class}");
        }
    }

    #[test]
    fn none_in_none_out() {
        assert_eq!(classify_bounce_status(None), None);
    }
}
