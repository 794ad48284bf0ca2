use thiserror::Error;
use tracing::info;

// =======================================================
// COMPILE-TIME LIMITS
// =======================================================

/// Upper bound on the sum of all cached payload sizes, in bytes.
pub const MAX_CACHE_SIZE: usize = 1_049_000;

/// Largest single response the proxy will keep in the cache, in bytes.
pub const MAX_OBJECT_SIZE: usize = 102_400;

/// Address every listener binds to; only the port is configurable.
pub const LISTEN_HOST: &str = "0.0.0.0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Usage: {program} <port>")]
    Usage { program: String },

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("max_object_size ({object}) exceeds max_cache_size ({cache})")]
    ObjectLargerThanCache { object: usize, cache: usize },
}

// =======================================================
// CACHE LIMITS
// =======================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    max_cache_size: usize,
    max_object_size: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_cache_size: MAX_CACHE_SIZE,
            max_object_size: MAX_OBJECT_SIZE,
        }
    }
}

impl CacheLimits {
    /// Custom limits, mostly for tests that need a tiny cache.
    ///
    /// A single object must never be able to exceed the whole cache.
    pub fn new(max_cache_size: usize, max_object_size: usize) -> Result<Self, ConfigError> {
        if max_object_size > max_cache_size {
            return Err(ConfigError::ObjectLargerThanCache {
                object: max_object_size,
                cache: max_cache_size,
            });
        }
        Ok(Self {
            max_cache_size,
            max_object_size,
        })
    }

    pub fn max_cache_size(&self) -> usize {
        self.max_cache_size
    }

    pub fn max_object_size(&self) -> usize {
        self.max_object_size
    }
}

// =======================================================
// PROXY CONFIG
// =======================================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub port: u16,
    pub limits: CacheLimits,
}

impl ProxyConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            limits: CacheLimits::default(),
        }
    }

    /// Builds the config from `argv`. Exactly one positional argument
    /// (the listening port) is accepted.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next().unwrap_or_else(|| "webproxy".to_string());
        let rest: Vec<String> = args.collect();

        let [port] = rest.as_slice() else {
            return Err(ConfigError::Usage { program });
        };

        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;

        Ok(Self::new(port))
    }

    /// "0.0.0.0:<port>"
    pub fn listen_addr(&self) -> String {
        format!("{LISTEN_HOST}:{}", self.port)
    }

    pub fn print(&self) {
        info!(
            target: "webproxy::config",
            listen = %self.listen_addr(),
            max_cache_size = self.limits.max_cache_size(),
            max_object_size = self.limits.max_object_size(),
            "Proxy configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_args_accepts_single_port() {
        let cfg = ProxyConfig::from_args(["webproxy", "15213"]).expect("expected ok");
        assert_eq!(cfg.port, 15213);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:15213");
        assert_eq!(cfg.limits, CacheLimits::default());
    }

    #[test]
    fn from_args_rejects_wrong_arg_count() {
        let err = ProxyConfig::from_args(["webproxy"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Usage {
                program: "webproxy".into()
            }
        );
        assert_eq!(err.to_string(), "Usage: webproxy <port>");

        let err = ProxyConfig::from_args(["webproxy", "1", "2"]).unwrap_err();
        assert!(matches!(err, ConfigError::Usage { .. }));
    }

    #[test]
    fn from_args_rejects_non_numeric_port() {
        let err = ProxyConfig::from_args(["webproxy", "http"]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("http".into()));
    }

    #[test]
    fn cache_limits_reject_object_larger_than_cache() {
        assert!(CacheLimits::new(10, 11).is_err());
        let limits = CacheLimits::new(10, 10).expect("expected ok");
        assert_eq!(limits.max_cache_size(), 10);
        assert_eq!(limits.max_object_size(), 10);
    }

    #[test]
    fn default_limits_match_constants() {
        let limits = CacheLimits::default();
        assert_eq!(limits.max_cache_size(), MAX_CACHE_SIZE);
        assert_eq!(limits.max_object_size(), MAX_OBJECT_SIZE);
    }
}
