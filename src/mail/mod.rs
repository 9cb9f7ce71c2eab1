//! Inbound mail diagnostics — DSN bounce classification and auto-reply detection.

pub mod autoreply;
pub mod bounce;
pub mod dsn;
pub mod headers;

pub use autoreply::detect_auto_reply;
pub use bounce::{BounceResult, InboundParser, ParsedMail, compute_bounce_info};
pub use dsn::{BounceType, DsnStatus, classify_bounce_status, find_bounce_status};
pub use headers::HeaderMap;
