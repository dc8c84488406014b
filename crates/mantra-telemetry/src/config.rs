//! Telemetry configuration from environment variables.

use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// `EnvFilter` directive, e.g. `info` or `mt_03_asset_worker=debug,info`.
    pub log_level: String,
    pub console_output: bool,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "mantra".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

fn flag(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value == "true" || value == "1"
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let is_container = lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("MANTRA_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("MANTRA_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: lookup("MANTRA_CONSOLE_OUTPUT")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0"))
                .unwrap_or(defaults.console_output),
            json_logs: lookup("MANTRA_JSON_LOGS").map(|v| flag(&v)).unwrap_or(is_container),
        }
    }

    /// Quiet configuration for tests: warnings only, no JSON.
    pub fn for_testing() -> Self {
        Self {
            log_level: "warn".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config, TelemetryConfig::default());
    }

    #[test]
    fn test_mantra_level_wins_over_rust_log() {
        let config = TelemetryConfig::from_lookup(lookup(&[("RUST_LOG", "debug"), ("MANTRA_LOG_LEVEL", "trace")]));
        assert_eq!(config.log_level, "trace");

        let config = TelemetryConfig::from_lookup(lookup(&[("RUST_LOG", "debug")]));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_json_logs_flag_and_container_default() {
        assert!(TelemetryConfig::from_lookup(lookup(&[("MANTRA_JSON_LOGS", "TRUE")])).json_logs);
        assert!(TelemetryConfig::from_lookup(lookup(&[("DOCKER_CONTAINER", "1")])).json_logs);
        assert!(!TelemetryConfig::from_lookup(lookup(&[("DOCKER_CONTAINER", "1"), ("MANTRA_JSON_LOGS", "false")])).json_logs);
    }

    #[test]
    fn test_console_output_can_be_disabled() {
        assert!(!TelemetryConfig::from_lookup(lookup(&[("MANTRA_CONSOLE_OUTPUT", "0")])).console_output);
        assert!(TelemetryConfig::from_lookup(lookup(&[("MANTRA_CONSOLE_OUTPUT", "yes")])).console_output);
    }
}
