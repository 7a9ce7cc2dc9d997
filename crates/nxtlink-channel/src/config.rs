use std::time::Duration;

/// Channel and link behavior.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long a synchronous `receive_message` waits for a telegram.
    pub reply_timeout: Duration,
    /// Read timeout of the link; the receive loop wakes at least this often.
    pub poll_interval: Duration,
    /// Pause after the stop-motor telegrams before the link is closed.
    pub settle_time: Duration,
    /// Pause after each tone so consecutive beeps stay audible.
    pub beep_gap: Duration,
    /// The brick is being paired; connect failures ask the user to accept
    /// the pairing request instead of reporting a plain socket error.
    pub pairing: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            settle_time: Duration::from_millis(500),
            beep_gap: Duration::from_millis(20),
            pairing: false,
        }
    }
}
