//! Global-message channel with single-timer semantics.
//!
//! The host owns the actual timer; this module hands out one token per shown
//! message. Re-showing cancels the pending token, so an earlier message's
//! timeout can never hide a later message.

/// Auto-hiding message slot for one form.
#[derive(Debug, Clone, Default)]
pub struct MessageChannel {
    generation: u64,
    current: Option<ActiveMessage>,
}

#[derive(Debug, Clone)]
struct ActiveMessage {
    text: String,
    token: u64,
}

impl MessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a message and returns the timer token the host should schedule
    /// the hide with. Any previously issued token becomes stale.
    pub fn show(&mut self, text: impl Into<String>) -> u64 {
        self.generation += 1;
        self.current = Some(ActiveMessage {
            text: text.into(),
            token: self.generation,
        });
        self.generation
    }

    /// Fires a timer. Returns true when the message was hidden; a stale
    /// token is a no-op.
    pub fn expire(&mut self, token: u64) -> bool {
        match &self.current {
            Some(active) if active.token == token => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|active| active.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_timer_cannot_hide_newer_message() {
        let mut channel = MessageChannel::new();
        let first = channel.show("first");
        let second = channel.show("second");
        assert!(!channel.expire(first));
        assert_eq!(channel.current(), Some("second"));
        assert!(channel.expire(second));
        assert_eq!(channel.current(), None);
    }
}
