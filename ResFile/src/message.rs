//! Diagnostic message sink
//!
//! Format probes report user-facing problems (skipped members, truncated
//! directories) through a [`MessageSink`]. Internal diagnostics go through
//! `tracing` instead.

use std::fmt;
use std::rc::Rc;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageLevel {
    Error = 1,
    Warning,
    Attention,
    Message,
    DebugWarn,
    DebugNotify,
}

impl MessageLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Attention => "attention",
            Self::Message => "message",
            Self::DebugWarn => "debug-warn",
            Self::DebugNotify => "debug-notify",
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver for diagnostic messages.
#[derive(Clone)]
pub struct MessageSink(Rc<dyn Fn(MessageLevel, &str)>);

impl MessageSink {
    /// Wrap a closure as a sink.
    pub fn new(f: impl Fn(MessageLevel, &str) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// A sink that discards everything.
    #[must_use]
    pub fn null() -> Self {
        Self::new(|_, _| {})
    }

    /// A sink that forwards every message to `tracing` at a matching level.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(|level, text| match level {
            MessageLevel::Error => tracing::error!("{text}"),
            MessageLevel::Warning | MessageLevel::Attention => tracing::warn!("{text}"),
            MessageLevel::Message => tracing::info!("{text}"),
            MessageLevel::DebugWarn | MessageLevel::DebugNotify => tracing::debug!("{text}"),
        })
    }

    pub fn emit(&self, level: MessageLevel, text: &str) {
        (self.0)(level, text);
    }
}

impl Default for MessageSink {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for MessageSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageSink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_sink_receives_messages() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let captured = Rc::clone(&seen);
        let sink = MessageSink::new(move |level, text| {
            captured.borrow_mut().push((level, text.to_string()));
        });

        sink.emit(MessageLevel::Warning, "skipped member");
        assert_eq!(
            seen.borrow().as_slice(),
            &[(MessageLevel::Warning, "skipped member".to_string())]
        );
    }

    #[test]
    fn test_default_sink_is_silent() {
        MessageSink::default().emit(MessageLevel::Error, "nobody listens");
    }
}
