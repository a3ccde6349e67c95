//! Linear backoff between delivery attempts.

use std::time::Duration;

/// Delay to wait after a failed `attempt` (1-based): `step_ms * attempt`.
pub fn linear_backoff(attempt: u32, step_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    Duration::from_millis(step_ms.saturating_mul(attempt as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(linear_backoff(0, 100), Duration::ZERO);
        assert_eq!(linear_backoff(1, 100), Duration::from_millis(100));
        assert_eq!(linear_backoff(2, 100), Duration::from_millis(200));
        assert_eq!(linear_backoff(3, 1000), Duration::from_millis(3000));
    }

    #[test]
    fn test_backoff_saturates() {
        assert_eq!(linear_backoff(u32::MAX, u64::MAX), Duration::from_millis(u64::MAX));
    }
}
