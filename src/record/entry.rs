use serde::{Deserialize, Serialize};

use super::{LogRecord, Timestamp};

/// A single structured log line.
///
/// This is the record type decoded by [`JsonLinesSource`](crate::source::JsonLinesSource)
/// when no custom type is supplied. The `template` carries the message
/// pattern a line was rendered from, when the producer records one, so that
/// filters can match on structure rather than on rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<String>,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<String>,
    #[serde(skip)]
    source_index: Option<usize>,
}

impl LogEntry {
    /// Create an entry with the given time and message.
    pub fn new(time: impl Into<Timestamp>, message: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            level: None,
            message: message.into(),
            template: None,
            source_index: None,
        }
    }

    /// Attach a severity level.
    pub fn with_level(self, level: impl Into<String>) -> Self {
        Self {
            level: Some(level.into()),
            ..self
        }
    }

    /// Attach the message template the line was rendered from.
    pub fn with_template(self, template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..self
        }
    }

    /// Severity level, if the producer recorded one.
    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    /// Rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message template, if the producer recorded one.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }
}

impl LogRecord for LogEntry {
    fn time(&self) -> Timestamp {
        self.time
    }

    fn source_index(&self) -> Option<usize> {
        self.source_index
    }

    fn set_source_index(&mut self, index: usize) {
        self.source_index = Some(index);
    }
}
