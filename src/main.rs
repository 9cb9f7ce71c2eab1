//! Delivery diagnostics for a single message file.
//!
//! Reads an RFC 5322 message, prints the bounce diagnosis and auto-reply
//! flag as JSON. Debugging aid for inbound mail handling.

use anyhow::Context;

use foidesk::config::MailConfig;
use foidesk::mail::InboundParser;
use foidesk::pipeline::{Disposition, classify_inbound};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: foidesk <message.eml>")?;
    let raw = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {path}"))?;

    let config = MailConfig::from_patterns(
        std::env::var("FOIDESK_AUTO_REPLY_EMAIL_REGEX").ok().as_deref(),
        std::env::var("FOIDESK_AUTO_REPLY_SUBJECT_REGEX").ok().as_deref(),
    )?;
    let parser = InboundParser::new(config);
    let mail = parser.parse(&raw)?;

    let disposition = match classify_inbound(&mail) {
        Disposition::Bounce(_) => "bounce",
        Disposition::AutoReply => "auto-reply",
        Disposition::Regular => "regular",
    };

    let out = serde_json::json!({
        "from": mail.from_address,
        "subject": mail.subject,
        "disposition": disposition,
        "bounce": mail.bounce_info(),
        "is_auto_reply": mail.is_auto_reply(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
