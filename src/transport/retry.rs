use std::time::Duration;

/// Backoff strategy for status polling
#[derive(Debug, Clone)]
pub enum Backoff {
    /// Exponential backoff (initial delay, maximum delay, multiplier)
    Exponential {
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    },
    /// Fixed delay between polls
    Fixed(Duration),
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// Compute the delay before attempt N
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Exponential {
                initial_delay,
                max_delay,
                multiplier,
            } => {
                let delay_ms = initial_delay.as_millis() as f64 * multiplier.powi(attempt as i32);
                Duration::from_millis(delay_ms as u64).min(*max_delay)
            }
            Backoff::Fixed(delay) => *delay,
        }
    }
}
