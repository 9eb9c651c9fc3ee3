//! Per-terminal diagnostics, routed through `tracing`.
//!
//! Each terminal carries its own [`DebugConfig`] injected at construction;
//! there is no process-global debug state. Unhandled escape sequences are
//! reported under [`DebugTopics::TODO`] with the verbatim bytes.

use bitflags::bitflags;

bitflags! {
    /// Diagnostic categories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugTopics: u16 {
        const CURSOR   = 1 << 0;
        const CHARSET  = 1 << 1;
        const ERASE    = 1 << 2;
        const SCROLL   = 1 << 3;
        const TEXT     = 1 << 4;
        const COMMANDS = 1 << 5;
        /// Recognized-but-unimplemented sequences.
        const TODO     = 1 << 6;
        const ERRORS   = 1 << 7;
    }
}

/// Which topics a terminal logs.
#[derive(Debug, Clone, Copy)]
pub struct DebugConfig {
    topics: DebugTopics,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            topics: DebugTopics::TODO | DebugTopics::ERRORS,
        }
    }
}

impl DebugConfig {
    /// Log nothing.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            topics: DebugTopics::empty(),
        }
    }

    /// Log exactly the given topics.
    #[must_use]
    pub fn with_topics(topics: DebugTopics) -> Self {
        Self { topics }
    }

    #[must_use]
    pub fn enabled(&self, topic: DebugTopics) -> bool {
        self.topics.intersects(topic)
    }

    pub(crate) fn log(&self, topic: DebugTopics, message: std::fmt::Arguments<'_>) {
        if !self.enabled(topic) {
            return;
        }
        if topic.intersects(DebugTopics::ERRORS) {
            tracing::warn!(target: "spanterm", topic = ?topic, "{message}");
        } else {
            tracing::debug!(target: "spanterm", topic = ?topic, "{message}");
        }
    }

    /// Report an unhandled or partially handled escape sequence verbatim.
    pub(crate) fn todo_sequence(&self, context: &str, bytes: &[u8]) {
        if !self.enabled(DebugTopics::TODO) {
            return;
        }
        tracing::debug!(
            target: "spanterm",
            topic = "todo",
            sequence = %String::from_utf8_lossy(bytes).escape_debug(),
            "{context}"
        );
    }
}
