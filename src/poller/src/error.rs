use std::time::Duration;

/// Error type predicates may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal failure of a poll.
///
/// `Ok(PollOutcome)` is the success state; every other way a poll can end
/// is one of these variants.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The predicate returned an error. Never retried.
    #[error("poll predicate failed on attempt {attempts}: {source}")]
    Predicate {
        attempts: u32,
        #[source]
        source: BoxError,
    },
    /// Every attempt reported "not yet satisfied" until the deadline.
    #[error("poll timed out after {timeout:?} ({attempts} attempts)")]
    Timeout { timeout: Duration, attempts: u32 },
    #[error("poll cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
    #[error("invalid poll request: {0}")]
    InvalidRequest(String),
}

impl PollError {
    /// Number of predicate invocations made before the poll ended.
    pub fn attempts(&self) -> u32 {
        match self {
            PollError::Predicate { attempts, .. }
            | PollError::Timeout { attempts, .. }
            | PollError::Cancelled { attempts } => *attempts,
            PollError::InvalidRequest(_) => 0,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_error_keeps_source() {
        let err = PollError::Predicate {
            attempts: 2,
            source: "metrics fetch failed".into(),
        };

        assert_eq!(err.attempts(), 2);
        assert!(!err.is_timeout());
        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "metrics fetch failed");
        assert_eq!(
            err.to_string(),
            "poll predicate failed on attempt 2: metrics fetch failed"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = PollError::Timeout {
            timeout: Duration::from_secs(60),
            attempts: 7,
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "poll timed out after 60s (7 attempts)");
    }
}
