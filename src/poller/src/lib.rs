//! Bounded polling of a caller-supplied predicate.
//!
//! A poll invokes the predicate, stops as soon as it reports the condition
//! satisfied or fails, and otherwise sleeps a fixed interval and tries again
//! until the timeout is reached. The deadline is only checked after an
//! attempt, so the predicate always runs at least once.
//!
//! Whatever the predicate needs (an API handle, flow names, expected
//! counters) is captured by the closure.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! let mut seen = 0;
//! let outcome = poller::poll(Duration::from_secs(1), Duration::from_secs(30), || {
//!     seen += 1;
//!     Ok::<_, std::io::Error>(seen >= 3)
//! })?;
//! assert_eq!(outcome.attempts, 3);
//! # Ok::<(), poller::PollError>(())
//! ```

use std::future::Future;
use std::time::Duration;

mod error;
mod request;

pub use error::{BoxError, PollError};
pub use request::{PollOutcome, PollRequest};
pub use tokio_util::sync::CancellationToken;

/// Poll `predicate` every `interval` until it returns `Ok(true)`, returns an
/// error, or `timeout` has elapsed. Blocks the calling thread.
pub fn poll<F, E>(
    interval: Duration,
    timeout: Duration,
    predicate: F,
) -> Result<PollOutcome, PollError>
where
    F: FnMut() -> Result<bool, E>,
    E: Into<BoxError>,
{
    PollRequest::new(interval, timeout)?.poll(predicate)
}

/// Async counterpart of [`poll`].
pub async fn poll_async<F, Fut, E>(
    interval: Duration,
    timeout: Duration,
    predicate: F,
) -> Result<PollOutcome, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Into<BoxError>,
{
    PollRequest::new(interval, timeout)?
        .poll_async(predicate)
        .await
}
