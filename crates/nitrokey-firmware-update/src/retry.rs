//! Bounded retry loops

use std::fmt;
use std::time::Duration;

/// Default delay between two tries.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_millis(500);

/// One attempt of a [`Retries`] loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Try {
    /// Zero-based attempt index
    pub i: usize,
    /// Total number of attempts
    pub retries: usize,
}

impl Try {
    /// Whether this is the last attempt.
    pub fn is_last(&self) -> bool {
        self.i.saturating_add(1) >= self.retries
    }
}

impl fmt::Display for Try {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "try {} of {}", self.i.saturating_add(1), self.retries)
    }
}

/// Iterator over a fixed number of attempts, sleeping before every attempt
/// except the first.
///
/// ```
/// use std::time::Duration;
/// use nitrokey_firmware_update::retry::Retries;
///
/// let mut slept = Duration::ZERO;
/// let tries: Vec<String> = Retries::new(3)
///     .with_sleeper(|d| slept += d)
///     .map(|t| t.to_string())
///     .collect();
/// assert_eq!(tries, ["try 1 of 3", "try 2 of 3", "try 3 of 3"]);
/// ```
pub struct Retries<'s> {
    retries: usize,
    timeout: Duration,
    next: usize,
    sleeper: Box<dyn FnMut(Duration) + 's>,
}

impl<'s> Retries<'s> {
    /// Create a loop with `retries` attempts.
    pub fn new(retries: usize) -> Self {
        Self {
            retries,
            timeout: DEFAULT_RETRY_TIMEOUT,
            next: 0,
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Set the delay between two attempts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the sleep function.
    pub fn with_sleeper(mut self, sleeper: impl FnMut(Duration) + 's) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }
}

impl Iterator for Retries<'_> {
    type Item = Try;

    fn next(&mut self) -> Option<Try> {
        if self.next >= self.retries {
            return None;
        }
        if self.next > 0 {
            (self.sleeper)(self.timeout);
        }
        let attempt = Try {
            i: self.next,
            retries: self.retries,
        };
        self.next = self.next.saturating_add(1);
        Some(attempt)
    }
}

impl fmt::Debug for Retries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retries")
            .field("retries", &self.retries)
            .field("timeout", &self.timeout)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleeps_between_tries_only() {
        let mut sleeps = Vec::new();
        let count = Retries::new(3)
            .with_timeout(Duration::from_secs(1))
            .with_sleeper(|d| sleeps.push(d))
            .count();
        assert_eq!(count, 3);
        assert_eq!(sleeps, [Duration::from_secs(1); 2]);
    }

    #[test]
    fn test_zero_retries() {
        let mut slept = false;
        assert_eq!(Retries::new(0).with_sleeper(|_| slept = true).next(), None);
        assert!(!slept);
    }

    #[test]
    fn test_last_try() {
        let tries: Vec<Try> = Retries::new(2).with_sleeper(|_| {}).collect();
        assert_eq!(tries.iter().map(Try::is_last).collect::<Vec<_>>(), [false, true]);
    }
}
