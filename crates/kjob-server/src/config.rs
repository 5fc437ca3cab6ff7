use std::{fmt::Display, str::FromStr, time::Duration};

use kjob_api::StreamConfig;
use kjob_kube::KubeSettings;
use kjob_observe::{LoggerConfig, LoggerFormat};
use thiserror::Error;

const PREFIX: &str = "KJOB_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

/// Which cluster client serves submissions and log streams.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ClusterBackend {
    #[default]
    Kube,
    Memory,
}

impl FromStr for ClusterBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kube" | "kubernetes" => Ok(Self::Kube),
            "memory" => Ok(Self::Memory),
            _ => Err("expected kube|memory".to_string()),
        }
    }
}

/// Process configuration, read from `KJOB_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub logger: LoggerConfig,
    pub kube: KubeSettings,
    pub stream: StreamConfig,
    /// `host:port` of Redis. `None` keeps catalog and secrets in memory.
    pub redis_address: Option<String>,
    pub cluster_backend: ClusterBackend,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset and blank variables take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Vars { lookup };

        let logger = LoggerConfig {
            format: env.parse("LOG_FORMAT", LoggerFormat::Text)?,
            level: env.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            ..LoggerConfig::default()
        };

        let deadline_secs: u64 = env.parse("KUBE_JOB_ACTIVE_DEADLINE_SECONDS", 0)?;
        let kube = KubeSettings {
            namespace: env.get("DEFAULT_NAMESPACE").unwrap_or_else(|| "default".to_string()),
            endpoint: env.get("KUBE_CLUSTER_HOST_NAME"),
            job_deadline: (deadline_secs > 0).then(|| Duration::from_secs(deadline_secs)),
        };

        let defaults = StreamConfig::default();
        let stream = StreamConfig {
            read_buffer_size: env.positive("LOGS_STREAM_READ_BUFFER_SIZE", defaults.read_buffer_size)?,
            write_buffer_size: env.positive("LOGS_STREAM_WRITE_BUFFER_SIZE", defaults.write_buffer_size)?,
        };

        Ok(Self {
            port: env.parse("APP_PORT", 5000)?,
            logger,
            kube,
            stream,
            redis_address: env.get("REDIS_ADDRESS"),
            cluster_backend: env.parse("CLUSTER_BACKEND", ClusterBackend::default())?,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&format!("{PREFIX}{name}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: format!("{PREFIX}{name}"),
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn positive(&self, name: &str, default: usize) -> Result<usize, ConfigError> {
        match self.parse(name, default)? {
            0 => Err(ConfigError::Invalid {
                var: format!("{PREFIX}{name}"),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            }),
            n => Ok(n),
        }
    }
}
