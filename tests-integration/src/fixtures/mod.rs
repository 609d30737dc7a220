//! Test fixtures for integration testing
//!
//! In-process stand-ins for an OTG server: a TCP endpoint for readiness
//! probing and a traffic generator answering flow metrics requests.

mod otg_endpoint;
mod traffic_generator;

pub use otg_endpoint::FakeOtgEndpoint;
pub use traffic_generator::SimulatedTrafficGenerator;
