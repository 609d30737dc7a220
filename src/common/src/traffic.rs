//! Flow loss verification.
//!
//! After traffic has been stopped, every flow's transmitted and received
//! packet counters are compared against the expected loss. A flow that sent
//! nothing is never reported as a failure.

use serde::{Deserialize, Serialize};

/// Allowed deviation from the expected loss, in percent.
pub const DEFAULT_LOSS_TOLERANCE_PCT: f64 = 2.0;

/// Transmit state reported for a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmitState {
    Started,
    Stopped,
}

/// Counters of a single flow as read from the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCounters {
    pub name: String,
    pub transmit: TransmitState,
    pub tx_packets: u64,
    pub rx_packets: u64,
}

impl FlowCounters {
    pub fn lost_packets(&self) -> u64 {
        self.tx_packets.saturating_sub(self.rx_packets)
    }

    /// Percentage of transmitted packets that were not received.
    pub fn loss_percent(&self) -> f64 {
        if self.tx_packets == 0 {
            return 0.0;
        }
        self.lost_packets() as f64 * 100.0 / self.tx_packets as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossExpectation {
    /// Everything sent is received.
    NoLoss,
    /// Nothing sent is received.
    TotalLoss,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrafficError {
    #[error("flow {flow}: loss {loss_pct:.2}% exceeds {max_pct:.2}%")]
    ExcessiveLoss {
        flow: String,
        loss_pct: f64,
        max_pct: f64,
    },
    #[error("flow {flow}: loss {loss_pct:.2}% is below expected {min_pct:.2}%")]
    UnexpectedDelivery {
        flow: String,
        loss_pct: f64,
        min_pct: f64,
    },
}

pub fn verify_flow(
    counters: &FlowCounters,
    expectation: LossExpectation,
    tolerance_pct: f64,
) -> Result<(), TrafficError> {
    let loss_pct = counters.loss_percent();
    log::info!(
        "Flow {}: tx={} rx={} loss={:.2}%",
        counters.name,
        counters.tx_packets,
        counters.rx_packets,
        loss_pct
    );

    if counters.tx_packets == 0 {
        log::warn!("Flow {} did not transmit any packets", counters.name);
        return Ok(());
    }

    match expectation {
        LossExpectation::NoLoss => {
            if counters.lost_packets() > 0 {
                log::debug!(
                    "Flow {}: sent {} but received {}",
                    counters.name,
                    counters.tx_packets,
                    counters.rx_packets
                );
            }
            if loss_pct > tolerance_pct {
                return Err(TrafficError::ExcessiveLoss {
                    flow: counters.name.clone(),
                    loss_pct,
                    max_pct: tolerance_pct,
                });
            }
        }
        LossExpectation::TotalLoss => {
            let min_pct = 100.0 - tolerance_pct;
            if loss_pct < min_pct {
                return Err(TrafficError::UnexpectedDelivery {
                    flow: counters.name.clone(),
                    loss_pct,
                    min_pct,
                });
            }
        }
    }
    Ok(())
}

/// Verify every flow, returning the first failure.
pub fn verify_flows<'a>(
    flows: impl IntoIterator<Item = &'a FlowCounters>,
    expectation: LossExpectation,
    tolerance_pct: f64,
) -> Result<(), TrafficError> {
    flows
        .into_iter()
        .try_for_each(|flow| verify_flow(flow, expectation, tolerance_pct))
}

/// True when there is at least one flow and all of them are in `state`.
pub fn all_in_state(flows: &[FlowCounters], state: TransmitState) -> bool {
    !flows.is_empty() && flows.iter().all(|flow| flow.transmit == state)
}
