use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, PollError};

/// Interval and deadline of a single poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollRequest {
    interval: Duration,
    timeout: Duration,
}

/// Successful end of a poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollOutcome {
    /// Predicate invocations, including the satisfied one.
    pub attempts: u32,
    /// Time from the start of the poll to the satisfied attempt.
    pub elapsed: Duration,
}

enum Step {
    Done(PollOutcome),
    Wait,
}

impl PollRequest {
    /// Both durations must be non-zero.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, PollError> {
        if interval.is_zero() {
            return Err(PollError::InvalidRequest(
                "interval must be greater than zero".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(PollError::InvalidRequest(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self { interval, timeout })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke `predicate` until it is satisfied, fails or the timeout is
    /// reached, blocking the current thread between attempts.
    pub fn poll<F, E>(&self, mut predicate: F) -> Result<PollOutcome, PollError>
    where
        F: FnMut() -> Result<bool, E>,
        E: Into<BoxError>,
    {
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);
            let result = predicate();
            let elapsed = start.elapsed();

            if let Step::Done(outcome) = self.evaluate(result, attempts, elapsed)? {
                return Ok(outcome);
            }
            std::thread::sleep(self.interval);
        }
    }

    /// Async form of [`PollRequest::poll`]. Sleeps on the tokio timer, so
    /// it honours a paused clock in tests.
    pub async fn poll_async<F, Fut, E>(&self, predicate: F) -> Result<PollOutcome, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: Into<BoxError>,
    {
        self.run_async(predicate, None).await
    }

    /// Like [`PollRequest::poll_async`], but stops with
    /// [`PollError::Cancelled`] once `cancel` fires. The token is checked
    /// before every attempt and raced against the sleep between attempts.
    pub async fn poll_async_with_cancel<F, Fut, E>(
        &self,
        cancel: &CancellationToken,
        predicate: F,
    ) -> Result<PollOutcome, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: Into<BoxError>,
    {
        self.run_async(predicate, Some(cancel)).await
    }

    async fn run_async<F, Fut, E>(
        &self,
        mut predicate: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<PollOutcome, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: Into<BoxError>,
    {
        let start = tokio::time::Instant::now();
        let mut attempts = 0u32;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                tracing::debug!(attempts, "poll cancelled");
                return Err(PollError::Cancelled { attempts });
            }

            attempts = attempts.saturating_add(1);
            let result = predicate().await;
            let elapsed = start.elapsed();

            if let Step::Done(outcome) = self.evaluate(result, attempts, elapsed)? {
                return Ok(outcome);
            }

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            tracing::debug!(attempts, "poll cancelled while waiting");
                            return Err(PollError::Cancelled { attempts });
                        }
                        _ = tokio::time::sleep(self.interval) => {}
                    }
                }
                None => tokio::time::sleep(self.interval).await,
            }
        }
    }

    fn evaluate<E>(
        &self,
        result: Result<bool, E>,
        attempts: u32,
        elapsed: Duration,
    ) -> Result<Step, PollError>
    where
        E: Into<BoxError>,
    {
        match result {
            Err(e) => {
                let source = e.into();
                tracing::debug!(attempts, error = %source, "poll predicate failed");
                Err(PollError::Predicate { attempts, source })
            }
            Ok(true) => {
                tracing::info!(attempts, ?elapsed, "poll condition satisfied");
                Ok(Step::Done(PollOutcome { attempts, elapsed }))
            }
            Ok(false) if elapsed >= self.timeout => {
                tracing::warn!(
                    attempts,
                    ?elapsed,
                    timeout = ?self.timeout,
                    "poll timed out"
                );
                Err(PollError::Timeout {
                    timeout: self.timeout,
                    attempts,
                })
            }
            Ok(false) => {
                tracing::debug!(
                    attempts,
                    ?elapsed,
                    next_in = ?self.interval,
                    "poll condition not yet satisfied"
                );
                Ok(Step::Wait)
            }
        }
    }
}
