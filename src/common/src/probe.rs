//! Readiness probing of the OTG server endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use poller::{CancellationToken, PollError, PollOutcome, PollRequest};
use tokio::net::TcpStream;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} did not resolve to any socket address")]
    NoAddress(String),
}

/// Poll until a TCP connection to `address` succeeds.
///
/// Refused or timed-out connections count as "not yet"; an address that
/// cannot be resolved ends the poll with [`PollError::Predicate`]. Each
/// connect attempt is bounded by `dial_timeout` and never outlives the
/// poll interval.
pub async fn wait_for_endpoint(
    address: &str,
    dial_timeout: Duration,
    request: &PollRequest,
    cancel: &CancellationToken,
) -> Result<PollOutcome, PollError> {
    let per_attempt = connect_timeout(dial_timeout, request);
    tracing::debug!(address, connect_timeout = ?per_attempt, interval = ?request.interval(), timeout = ?request.timeout(), "waiting for endpoint");
    request
        .poll_async_with_cancel(cancel, || probe_once(address, per_attempt))
        .await
}

fn connect_timeout(dial_timeout: Duration, request: &PollRequest) -> Duration {
    dial_timeout.min(request.interval())
}

async fn probe_once(address: &str, connect_timeout: Duration) -> Result<bool, ProbeError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(address)
        .await
        .map_err(|source| ProbeError::Resolve {
            address: address.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(ProbeError::NoAddress(address.to_string()));
    }

    for addr in addrs {
        match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => {
                tracing::debug!(%addr, "endpoint accepted connection");
                return Ok(true);
            }
            Ok(Err(e)) => tracing::debug!(%addr, error = %e, "endpoint not reachable yet"),
            Err(_) => tracing::debug!(%addr, "connect attempt timed out"),
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;
    use tokio::net::TcpListener;

    const DIAL: Duration = Duration::from_secs(1);

    fn fast_request() -> PollRequest {
        PollRequest::new(Duration::from_millis(20), Duration::from_millis(200)).unwrap()
    }

    #[test]
    fn test_connect_timeout_is_capped_by_interval() {
        let request = PollRequest::new(Duration::from_secs(10), Duration::from_secs(60)).unwrap();

        assert_eq!(
            connect_timeout(Duration::from_secs(180), &request),
            Duration::from_secs(10)
        );
        assert_eq!(
            connect_timeout(Duration::from_secs(2), &request),
            Duration::from_secs(2)
        );
    }

    #[tokio::test]
    #[timeout(10000)]
    async fn test_listening_endpoint_is_ready_on_first_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let outcome = wait_for_endpoint(&address, DIAL, &fast_request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    #[timeout(10000)]
    async fn test_unresolvable_address_is_fatal() {
        let err = wait_for_endpoint("no-port-here", DIAL, &fast_request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Predicate { attempts: 1, .. }));
    }
}
