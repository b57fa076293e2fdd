use std::env;
use std::str::FromStr;

use crate::triage::BoardPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhatsAppConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    pub otlp_endpoint: Option<String>,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub bind_addr: String,
    pub board_policy: BoardPolicy,
    pub worker_concurrency: usize,
    pub cors_allowed_origin: String,
    pub app_id: Option<String>,
    pub app_version: Option<String>,
    pub whatsapp: WhatsAppConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let rollover_hour: u32 = parse_or(&get, "BOARD_ROLLOVER_HOUR_UTC", 5)?;
        let board_policy =
            BoardPolicy::new(rollover_hour).map_err(|reason| ConfigError::Invalid {
                name: "BOARD_ROLLOVER_HOUR_UTC",
                value: rollover_hour.to_string(),
                reason,
            })?;

        let worker_concurrency: usize = parse_or(&get, "WORKER_CONCURRENCY", 2)?;
        if worker_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "WORKER_CONCURRENCY",
                value: "0".into(),
                reason: "at least one worker is required".into(),
            });
        }

        Ok(Self {
            database_url,
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            board_policy,
            worker_concurrency,
            cors_allowed_origin: get("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            app_id: get("APP_ID"),
            app_version: get("APP_VERSION"),
            whatsapp: WhatsAppConfig {
                api_url: get("WHATSAPP_API_URL"),
                api_token: get("WHATSAPP_API_TOKEN"),
                group_id: get("WHATSAPP_GROUP_ID"),
            },
            telemetry: TelemetryConfig {
                json_logs: get("RUST_LOG_FORMAT").is_some_and(|f| f == "json"),
                otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            },
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/triage")]).unwrap();
        assert_eq!(cfg.redis_url, "redis://localhost:6379");
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.board_policy.rollover_hour, 5);
        assert_eq!(cfg.worker_concurrency, 2);
        assert_eq!(cfg.whatsapp, WhatsAppConfig::default());
        assert!(!cfg.telemetry.json_logs);
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn rollover_hour_must_be_a_valid_hour() {
        let err = config(&[("DATABASE_URL", "x"), ("BOARD_ROLLOVER_HOUR_UTC", "24")]).unwrap_err();
        assert!(err.to_string().starts_with("BOARD_ROLLOVER_HOUR_UTC"));

        let err = config(&[("DATABASE_URL", "x"), ("BOARD_ROLLOVER_HOUR_UTC", "dawn")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let cfg = config(&[("DATABASE_URL", "x"), ("BOARD_ROLLOVER_HOUR_UTC", "0")]).unwrap();
        assert_eq!(cfg.board_policy.rollover_hour, 0);
    }

    #[test]
    fn whatsapp_and_logging_settings_are_read() {
        let cfg = config(&[
            ("DATABASE_URL", "x"),
            ("WHATSAPP_API_URL", "https://wa.example"),
            ("WHATSAPP_API_TOKEN", "secret"),
            ("WHATSAPP_GROUP_ID", "group-1"),
            ("RUST_LOG_FORMAT", "json"),
            ("WORKER_CONCURRENCY", "4"),
        ])
        .unwrap();
        assert_eq!(cfg.whatsapp.group_id.as_deref(), Some("group-1"));
        assert!(cfg.telemetry.json_logs);
        assert_eq!(cfg.worker_concurrency, 4);
        assert!(config(&[("DATABASE_URL", "x"), ("WORKER_CONCURRENCY", "0")]).is_err());
    }
}
