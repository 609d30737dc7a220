//! The slice of the OTG control and metrics API the traffic tests rely on,
//! plus the poll predicates built on it.

use anyhow::Result;
use async_trait::async_trait;
use common::traffic::{FlowCounters, TransmitState, all_in_state};
use mockall::automock;
use poller::{PollError, PollOutcome, PollRequest};

#[automock]
#[async_trait]
pub trait FlowMetricsApi: Send + Sync {
    /// Request a transmit state change for `flows`.
    async fn set_transmit(&self, flows: &[String], state: TransmitState) -> Result<()>;

    /// Fetch the current counters of `flows`.
    async fn flow_metrics(&self, flows: &[String]) -> Result<Vec<FlowCounters>>;
}

/// Predicate: every flow reports `state`.
pub async fn flows_in_state(
    api: &dyn FlowMetricsApi,
    flows: &[String],
    state: TransmitState,
) -> Result<bool> {
    let metrics = api.flow_metrics(flows).await?;
    for flow in &metrics {
        log::debug!("Flow {} transmit state {:?}", flow.name, flow.transmit);
    }
    Ok(all_in_state(&metrics, state))
}

/// Predicate: every flow has received at least `min_rx_packets`.
pub async fn flows_received_at_least(
    api: &dyn FlowMetricsApi,
    flows: &[String],
    min_rx_packets: u64,
) -> Result<bool> {
    let metrics = api.flow_metrics(flows).await?;
    Ok(!metrics.is_empty() && metrics.iter().all(|flow| flow.rx_packets >= min_rx_packets))
}

pub async fn wait_for_transmit_state(
    api: &dyn FlowMetricsApi,
    flows: &[String],
    state: TransmitState,
    request: &PollRequest,
) -> Result<PollOutcome, PollError> {
    request
        .poll_async(|| flows_in_state(api, flows, state))
        .await
}

pub async fn wait_for_received(
    api: &dyn FlowMetricsApi,
    flows: &[String],
    min_rx_packets: u64,
    request: &PollRequest,
) -> Result<PollOutcome, PollError> {
    request
        .poll_async(|| flows_received_at_least(api, flows, min_rx_packets))
        .await
}
