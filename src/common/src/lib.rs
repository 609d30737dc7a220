pub mod cli;
pub mod config;
pub mod location;
pub mod probe;
pub mod traffic;

pub use config::HarnessConfig;
