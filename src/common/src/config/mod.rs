use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Data, Env, Format, Serialized, Toml},
};

use poller::{PollError, PollRequest};

use crate::location::normalize_port_location;

/// Default configuration file, looked up from the working directory upwards.
pub const CONFIG_FILE: &str = "otg-harness.toml";

/// Prefix of nested environment overrides, e.g. `OTG__POLL__TIMEOUT=2m`.
pub const ENV_PREFIX: &str = "OTG__";

/// Flat variables understood by the existing test scripts, with the section
/// and field they set. They win over everything else when non-empty.
pub const LEGACY_ENV_VARS: [(&str, &str, &str); 3] = [
    ("PORT1", "ports", "port1"),
    ("PORT2", "ports", "port2"),
    ("OTGSERVER", "server", "location"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for the OTG server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` of the OTG server
    ///
    /// Env: OTG__SERVER__LOCATION or OTGSERVER
    pub location: String,
    /// Upper bound for a single connect attempt
    ///
    /// Env: OTG__SERVER__DIAL_TIMEOUT
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            location: String::from("localhost:50051"),
            dial_timeout: Duration::from_secs(3 * 60),
        }
    }
}

/// Test port locations, in `//chassis/card/port` form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortsConfig {
    /// Env: OTG__PORTS__PORT1 or PORT1
    pub port1: String,
    /// Env: OTG__PORTS__PORT2 or PORT2
    pub port2: String,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            port1: String::from("//10.61.37.185/1/1"),
            port2: String::from("//10.61.37.185/1/2"),
        }
    }
}

/// Interval and deadline used when polling the server for a condition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
        }
    }
}

impl PollConfig {
    pub fn request(&self) -> Result<PollRequest, PollError> {
        PollRequest::new(self.interval, self.timeout)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HarnessConfig {
    pub server: ServerConfig,
    pub ports: PortsConfig,
    pub poll: PollConfig,
}

impl HarnessConfig {
    /// Load from defaults, [`CONFIG_FILE`], `OTG__` variables and the
    /// legacy variables, in increasing precedence.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment(Toml::file(CONFIG_FILE)))
    }

    /// Like [`HarnessConfig::load`] with an explicit file, which must exist.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::extract(Self::figment(Toml::file(path)))
    }

    pub fn figment(file: Data<Toml>) -> Figment {
        let legacy = legacy_env(|var| std::env::var(var).ok());
        Figment::from(Serialized::defaults(HarnessConfig::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(legacy))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: HarnessConfig = figment.extract().map_err(Box::new)?;
        config.ports.port1 = normalize_port_location(&config.ports.port1);
        config.ports.port2 = normalize_port_location(&config.ports.port2);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.location.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server location cannot be empty".to_string(),
            ));
        }
        if self.server.dial_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "server dial timeout must be greater than zero".to_string(),
            ));
        }
        for (name, location) in [("port1", &self.ports.port1), ("port2", &self.ports.port2)] {
            if location.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{name} location cannot be empty"
                )));
            }
        }
        self.poll
            .request()
            .map_err(|e| ConfigError::Invalid(format!("poll settings: {e}")))?;
        Ok(())
    }
}

/// Nested overrides from the legacy variables. Unset and empty variables
/// leave the lower layers alone.
fn legacy_env(lookup: impl Fn(&str) -> Option<String>) -> serde_json::Value {
    let mut sections = serde_json::Map::new();
    for (var, section, field) in LEGACY_ENV_VARS {
        let Some(value) = lookup(var).filter(|value| !value.trim().is_empty()) else {
            continue;
        };
        let entry = sections
            .entry(section)
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if let Some(table) = entry.as_object_mut() {
            table.insert(field.to_string(), serde_json::Value::String(value));
        }
    }
    serde_json::Value::Object(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load_in_jail() -> Result<HarnessConfig, figment::Error> {
        HarnessConfig::load().map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn test_default_configuration() {
        let config = HarnessConfig::default();

        assert_eq!(config.server.location, "localhost:50051");
        assert_eq!(config.server.dial_timeout, Duration::from_secs(180));
        assert_eq!(config.ports.port1, "//10.61.37.185/1/1");
        assert_eq!(config.ports.port2, "//10.61.37.185/1/2");
        assert_eq!(config.poll.interval, Duration::from_secs(10));
        assert_eq!(config.poll.timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = load_in_jail()?;
            assert_eq!(config, HarnessConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [server]
                location = "otg.lab:40051"

                [ports]
                port1 = "10.0.0.1/2/1"

                [poll]
                interval = "2s"
                timeout = "1m 30s"
                "#,
            )?;

            let config = load_in_jail()?;
            assert_eq!(config.server.location, "otg.lab:40051");
            assert_eq!(config.server.dial_timeout, Duration::from_secs(180));
            assert_eq!(config.ports.port1, "//10.0.0.1/2/1");
            assert_eq!(config.ports.port2, "//10.61.37.185/1/2");
            assert_eq!(config.poll.interval, Duration::from_secs(2));
            assert_eq!(config.poll.timeout, Duration::from_secs(90));
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[poll]\ninterval = \"2s\"\n")?;
            jail.set_env("OTG__POLL__INTERVAL", "500ms");
            jail.set_env("OTG__SERVER__DIAL_TIMEOUT", "30s");

            let config = load_in_jail()?;
            assert_eq!(config.poll.interval, Duration::from_millis(500));
            assert_eq!(config.server.dial_timeout, Duration::from_secs(30));
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("OTG__SERVER__LOCATION", "from-prefixed:1");
            jail.set_env("OTGSERVER", "10.9.8.7:50051");
            jail.set_env("PORT1", "10.109.121.181/1/1");
            jail.set_env("PORT2", "//10.109.123.254/1/1/");

            let config = load_in_jail()?;
            assert_eq!(config.server.location, "10.9.8.7:50051");
            assert_eq!(config.ports.port1, "//10.109.121.181/1/1");
            assert_eq!(config.ports.port2, "//10.109.123.254/1/1");
            Ok(())
        });
    }

    #[test]
    fn test_empty_legacy_env_keeps_lower_layers() {
        Jail::expect_with(|jail| {
            jail.set_env("OTG__PORTS__PORT2", "10.1.1.1/1/2");
            jail.set_env("PORT1", "");
            jail.set_env("PORT2", "  ");
            jail.set_env("OTGSERVER", "");

            let config = load_in_jail()?;
            assert_eq!(config.server.location, "localhost:50051");
            assert_eq!(config.ports.port1, "//10.61.37.185/1/1");
            assert_eq!(config.ports.port2, "//10.1.1.1/1/2");
            assert!(config.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_only_sets_present_fields() {
        let overrides = legacy_env(|var| (var == "PORT2").then(|| "10.2.2.2/1/1".to_string()));
        assert_eq!(
            overrides,
            serde_json::json!({ "ports": { "port2": "10.2.2.2/1/1" } })
        );
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = HarnessConfig::load_from_path(Path::new("/nonexistent/otg-harness.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_explicit_path() {
        Jail::expect_with(|jail| {
            jail.create_file("lab.toml", "[server]\nlocation = \"lab:50051\"\n")?;

            let config = HarnessConfig::load_from_path(Path::new("lab.toml"))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.server.location, "lab:50051");
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HarnessConfig::default();
        config.poll.interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = HarnessConfig::default();
        config.ports.port2 = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = HarnessConfig::default();
        config.server.location = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
