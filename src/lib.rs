//! foidesk — inbound mail diagnostics and attachment publication core for an
//! FOI request platform.

pub mod attachments;
pub mod config;
pub mod error;
pub mod mail;
pub mod pipeline;
