//! Link statistics tracking.

/// Counters describing the traffic a radio has handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadioStatistics {
    /// Frames handed to the driver, retries and failed sends included.
    pub frames_sent: u64,
    /// Frames the driver reported it could not send.
    pub transmit_failures: u64,
    /// Frames read from the driver, valid or not.
    pub frames_received: u64,
    /// ACKs answered on behalf of peers.
    pub acks_sent: u64,
    /// Attempts that failed or timed out and were queued again.
    pub retries: u64,
    /// Complete messages handed to the application.
    pub messages_delivered: u64,
    /// Outbound frames dropped after the retry ceiling.
    pub messages_dropped: u64,
    /// Payload bytes of acknowledged frames.
    pub bytes_sent: u64,
    /// Payload bytes of frames that passed verification.
    pub bytes_received: u64,
}

impl RadioStatistics {
    /// Share of send attempts that were followed by another attempt of the same frame.
    ///
    /// Both counters include attempts the driver failed to send, so the rate stays within 0.0..=1.0.
    pub fn retry_rate(&self) -> f32 {
        if self.frames_sent == 0 {
            return 0.0;
        }
        self.retries as f32 / self.frames_sent as f32
    }

    /// Resets all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_initialized_to_zero() {
        let stats = RadioStatistics::default();
        assert_eq!(stats.frames_sent, 0);
        assert_eq!(stats.messages_dropped, 0);
        assert_eq!(stats.retry_rate(), 0.0);
    }

    #[test]
    fn test_retry_rate() {
        let stats = RadioStatistics { frames_sent: 40, retries: 10, ..Default::default() };
        assert!((stats.retry_rate() - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_retry_rate_with_failed_sends() {
        // Three failed sends of one frame: two were retried, the last one dropped.
        let stats = RadioStatistics { frames_sent: 3, transmit_failures: 3, retries: 2, ..Default::default() };
        assert!(stats.retry_rate() <= 1.0);
        assert!((stats.retry_rate() - 2.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_reset() {
        let mut stats = RadioStatistics { frames_received: 7, bytes_received: 300, ..Default::default() };
        stats.reset();
        assert_eq!(stats, RadioStatistics::default());
    }
}
