/// Common test utilities and helpers for integration tests
use common::config::{HarnessConfig, PollConfig};
use std::time::Duration;

pub mod fixtures;
pub mod metrics_api;
pub mod test_helpers;

/// Create a harness configuration pointing at `server_location` with poll
/// settings short enough for tests.
pub fn create_test_config(server_location: &str) -> HarnessConfig {
    let mut config = HarnessConfig::default();

    config.server.location = server_location.to_string();
    config.ports.port1 = "//127.0.0.1/1/1".to_string();
    config.ports.port2 = "//127.0.0.1/1/2".to_string();
    config.poll = PollConfig {
        interval: Duration::from_millis(20),
        timeout: Duration::from_secs(2),
    };

    config
}

/// Initialize test logging
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
