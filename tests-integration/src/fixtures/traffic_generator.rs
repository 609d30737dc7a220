use anyhow::{Result, bail};
use async_trait::async_trait;
use common::traffic::{FlowCounters, TransmitState};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::metrics_api::FlowMetricsApi;

#[derive(Debug)]
struct SimulatedFlow {
    transmit: TransmitState,
    /// Requested state and the number of metrics fetches until it applies.
    pending: Option<(TransmitState, u32)>,
    tx_packets: u64,
    rx_packets: u64,
}

/// In-memory traffic generator.
///
/// Transmit state changes only become visible after a number of metrics
/// fetches, the way a real server reports them with some lag. While a flow
/// is started, every fetch advances its counters.
pub struct SimulatedTrafficGenerator {
    flows: Mutex<HashMap<String, SimulatedFlow>>,
    settle_fetches: u32,
    packets_per_fetch: u64,
    drop_percent: u64,
}

impl SimulatedTrafficGenerator {
    pub fn new<I, S>(flow_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let flows = flow_names
            .into_iter()
            .map(|name| {
                (
                    name.into(),
                    SimulatedFlow {
                        transmit: TransmitState::Stopped,
                        pending: None,
                        tx_packets: 0,
                        rx_packets: 0,
                    },
                )
            })
            .collect();

        Self {
            flows: Mutex::new(flows),
            settle_fetches: 2,
            packets_per_fetch: 100,
            drop_percent: 0,
        }
    }

    /// Fetches needed before a requested state change is reported.
    pub fn with_settle_fetches(mut self, fetches: u32) -> Self {
        self.settle_fetches = fetches;
        self
    }

    pub fn with_packets_per_fetch(mut self, packets: u64) -> Self {
        self.packets_per_fetch = packets;
        self
    }

    /// Percentage of transmitted packets that never arrive (0..=100).
    pub fn with_drop_percent(mut self, percent: u64) -> Self {
        self.drop_percent = percent.min(100);
        self
    }

    fn advance(&self, flow: &mut SimulatedFlow) {
        if let Some((state, remaining)) = flow.pending.take() {
            if remaining <= 1 {
                flow.transmit = state;
            } else {
                flow.pending = Some((state, remaining - 1));
            }
        }

        if flow.transmit == TransmitState::Started {
            flow.tx_packets += self.packets_per_fetch;
            flow.rx_packets += self.packets_per_fetch * (100 - self.drop_percent) / 100;
        }
    }
}

#[async_trait]
impl FlowMetricsApi for SimulatedTrafficGenerator {
    async fn set_transmit(&self, flows: &[String], state: TransmitState) -> Result<()> {
        let mut known = self.flows.lock().await;
        if let Some(unknown) = flows.iter().find(|name| !known.contains_key(*name)) {
            bail!("unknown flow {unknown}");
        }

        for name in flows {
            if let Some(flow) = known.get_mut(name) {
                if self.settle_fetches == 0 {
                    flow.transmit = state;
                    flow.pending = None;
                } else {
                    flow.pending = Some((state, self.settle_fetches));
                }
            }
        }
        log::info!("Requested {state:?} for flows {flows:?}");
        Ok(())
    }

    async fn flow_metrics(&self, flows: &[String]) -> Result<Vec<FlowCounters>> {
        let mut known = self.flows.lock().await;
        let mut metrics = Vec::with_capacity(flows.len());

        for name in flows {
            let Some(flow) = known.get_mut(name) else {
                bail!("unknown flow {name}");
            };
            self.advance(flow);
            metrics.push(FlowCounters {
                name: name.clone(),
                transmit: flow.transmit,
                tx_packets: flow.tx_packets,
                rx_packets: flow.rx_packets,
            });
        }

        Ok(metrics)
    }
}
