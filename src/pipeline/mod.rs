//! Inbound disposition — routes bounces and auto-replies ahead of normal
//! message handling.

use tracing::debug;

use crate::mail::{BounceResult, ParsedMail};

/// What inbound processing should do with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Delivery failure report; feed the bounce handling path.
    Bounce(BounceResult),
    /// Automatic reply; do not treat as a response from the public body.
    AutoReply,
    /// A regular message.
    Regular,
}

/// Classify an inbound message. Bounce detection wins over auto-reply:
/// DSN reports routinely carry auto-submitted markers too.
pub fn classify_inbound(mail: &ParsedMail) -> Disposition {
    let info = mail.bounce_info();
    if info.is_bounce {
        debug!(
            from = %mail.from_address,
            bounce_type = ?info.bounce_type,
            "Inbound message is a bounce"
        );
        return Disposition::Bounce(info.clone());
    }
    if mail.is_auto_reply() {
        debug!(from = %mail.from_address, "Inbound message is an auto-reply");
        return Disposition::AutoReply;
    }
    Disposition::Regular
}
