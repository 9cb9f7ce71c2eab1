//! Configuration types.

use regex::Regex;

use crate::error::ConfigError;

/// Mail classification configuration.
///
/// Both auto-reply patterns are optional and injected at construction —
/// there is no process-wide pattern state, so tests and deployments can
/// vary them freely.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    /// Matched against the sender address when the fixed auto-reply
    /// header markers are absent.
    pub auto_reply_email_regex: Option<Regex>,
    /// Matched against the subject line as the last auto-reply check.
    pub auto_reply_subject_regex: Option<Regex>,
}

impl MailConfig {
    /// Compile a config from optional pattern strings.
    pub fn from_patterns(
        email_pattern: Option<&str>,
        subject_pattern: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let compile = |key: &str, pattern: Option<&str>| -> Result<Option<Regex>, ConfigError> {
            pattern
                .map(|p| {
                    Regex::new(p).map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    })
                })
                .transpose()
        };

        Ok(Self {
            auto_reply_email_regex: compile("auto_reply_email_regex", email_pattern)?,
            auto_reply_subject_regex: compile("auto_reply_subject_regex", subject_pattern)?,
        })
    }
}
