//! Client configuration options.

use std::time::Duration;

use kvhelper_core::{coerce, merge, ConfigMap, Value};

use crate::Error;

/// Setting names understood by [`ClientOptions::from_config`]
pub mod settings {
    pub const HOST: &str = "host";
    pub const PORT: &str = "port";
    pub const DB: &str = "db";
    pub const PASSWORD: &str = "password";
    pub const PREFIX: &str = "prefix";
    pub const CONNECT_TIMEOUT_MS: &str = "connect_timeout_ms";
    pub const RESPONSE_TIMEOUT_MS: &str = "response_timeout_ms";
    pub const SCAN_COUNT: &str = "scan_count";
}

/// Options for configuring the client connection.
///
/// # Example
///
/// ```rust
/// use kvhelper_client::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions::new("cache.internal")
///     .with_port(6380)
///     .with_prefix("app:")
///     .with_response_timeout(Duration::from_secs(1));
/// assert_eq!(options.url(), "redis://cache.internal:6380/0");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,

    /// Logical database index
    pub db: i64,

    pub password: Option<String>,

    /// Prepended to every key the client touches
    pub prefix: String,

    pub connect_timeout: Duration,
    pub response_timeout: Duration,

    /// COUNT hint passed to each SCAN page
    pub scan_count: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
            prefix: String::new(),
            connect_timeout: Duration::from_millis(5000),
            response_timeout: Duration::from_millis(3000),
            scan_count: 100,
        }
    }
}

impl ClientOptions {
    /// Create default options pointing at the given host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the key prefix, e.g. `"myapp:"`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count;
        self
    }

    /// The defaults as a flat configuration map, used as the merge base.
    pub fn default_config() -> ConfigMap {
        let defaults = Self::default();
        ConfigMap::from([
            (settings::HOST.to_string(), Value::from(defaults.host)),
            (settings::PORT.to_string(), Value::from(defaults.port)),
            (settings::DB.to_string(), Value::from(defaults.db)),
            (settings::PREFIX.to_string(), Value::from(defaults.prefix)),
            (
                settings::CONNECT_TIMEOUT_MS.to_string(),
                Value::from(duration_millis(defaults.connect_timeout)),
            ),
            (
                settings::RESPONSE_TIMEOUT_MS.to_string(),
                Value::from(duration_millis(defaults.response_timeout)),
            ),
            (
                settings::SCAN_COUNT.to_string(),
                Value::from(i64::try_from(defaults.scan_count).unwrap_or(i64::MAX)),
            ),
        ])
    }

    /// Build options by merging caller overrides onto [`default_config`](Self::default_config).
    ///
    /// Overrides that are falsy (`0`, `""`, `null`, `false`) are ignored, so
    /// they cannot reset a default. Numeric settings accept numbers or numeric
    /// strings. Settings missing from the merged map keep their defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kvhelper_client::ClientOptions;
    /// use kvhelper_core::{ConfigMap, Value};
    ///
    /// let overrides = ConfigMap::from([
    ///     ("host".to_string(), Value::from("redis.local")),
    ///     ("port".to_string(), Value::from("6380")),
    ///     ("prefix".to_string(), Value::Null),
    /// ]);
    ///
    /// let options = ClientOptions::from_config(Some(&overrides)).unwrap();
    /// assert_eq!(options.host, "redis.local");
    /// assert_eq!(options.port, 6380);
    /// assert_eq!(options.prefix, "");
    /// ```
    pub fn from_config(overrides: Option<&ConfigMap>) -> Result<Self, Error> {
        let merged = merge(Some(&Self::default_config()), overrides);
        let defaults = Self::default();

        Ok(Self {
            host: text(&merged, settings::HOST)?.unwrap_or(defaults.host),
            port: integer(&merged, settings::PORT)?.unwrap_or(defaults.port),
            db: integer(&merged, settings::DB)?.unwrap_or(defaults.db),
            password: text(&merged, settings::PASSWORD)?,
            prefix: text(&merged, settings::PREFIX)?.unwrap_or(defaults.prefix),
            connect_timeout: integer(&merged, settings::CONNECT_TIMEOUT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            response_timeout: integer(&merged, settings::RESPONSE_TIMEOUT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.response_timeout),
            scan_count: integer(&merged, settings::SCAN_COUNT)?.unwrap_or(defaults.scan_count),
        })
    }

    /// Create options from environment variables.
    ///
    /// Reads `KVHELPER_HOST`, `KVHELPER_PORT`, `KVHELPER_DB`,
    /// `KVHELPER_PASSWORD` and `KVHELPER_PREFIX`; unset variables keep their
    /// defaults.
    pub fn from_env() -> Result<Self, Error> {
        let overrides: ConfigMap = [
            ("KVHELPER_HOST", settings::HOST),
            ("KVHELPER_PORT", settings::PORT),
            ("KVHELPER_DB", settings::DB),
            ("KVHELPER_PASSWORD", settings::PASSWORD),
            ("KVHELPER_PREFIX", settings::PREFIX),
        ]
        .into_iter()
        .filter_map(|(var, setting)| {
            std::env::var(var)
                .ok()
                .map(|value| (setting.to_string(), Value::Str(value)))
        })
        .collect();

        Self::from_config(Some(&overrides))
    }

    /// Server URL for display. The password is never included.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn invalid(setting: &str, reason: impl std::fmt::Display) -> Error {
    Error::InvalidOptions(format!("'{}' {}", setting, reason))
}

fn text(config: &ConfigMap, setting: &str) -> Result<Option<String>, Error> {
    match config.get(setting) {
        None | Some(Value::Undefined | Value::Null) => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(setting, format!("must be a string, got {}", other))),
    }
}

fn integer<T: TryFrom<i64>>(config: &ConfigMap, setting: &str) -> Result<Option<T>, Error> {
    let Some(value) = config.get(setting) else {
        return Ok(None);
    };
    match coerce(value) {
        Value::Undefined | Value::Null => Ok(None),
        Value::Int(n) => T::try_from(n)
            .map(Some)
            .map_err(|_| invalid(setting, format!("is out of range: {}", n))),
        other => Err(invalid(setting, format!("must be an integer, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, Value)]) -> ConfigMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.host, "127.0.0.1");
        assert_eq!(options.port, 6379);
        assert_eq!(options.prefix, "");
        assert_eq!(options.url(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn test_builder_pattern_chaining() {
        let options = ClientOptions::new("example.com")
            .with_port(7000)
            .with_db(2)
            .with_password("secret")
            .with_prefix("svc:")
            .with_scan_count(500);

        assert_eq!(options.url(), "redis://example.com:7000/2");
        assert_eq!(options.password.as_deref(), Some("secret"));
        assert_eq!(options.prefix, "svc:");
        assert_eq!(options.scan_count, 500);
    }

    #[test]
    fn test_url_hides_password() {
        let options = ClientOptions::default().with_password("hunter2");
        assert!(!options.url().contains("hunter2"));
    }

    #[test]
    fn test_from_config_without_overrides_uses_defaults() {
        assert_eq!(
            ClientOptions::from_config(None).unwrap(),
            ClientOptions::default()
        );
        assert_eq!(
            ClientOptions::from_config(Some(&ConfigMap::new())).unwrap(),
            ClientOptions::default()
        );
    }

    #[test]
    fn test_from_config_applies_truthy_overrides() {
        let overrides = config(&[
            ("host", Value::from("10.0.0.5")),
            ("port", Value::Int(6380)),
            ("password", Value::from("pw")),
            ("prefix", Value::from("app:")),
            ("response_timeout_ms", Value::from("250")),
        ]);

        let options = ClientOptions::from_config(Some(&overrides)).unwrap();
        assert_eq!(options.host, "10.0.0.5");
        assert_eq!(options.port, 6380);
        assert_eq!(options.password.as_deref(), Some("pw"));
        assert_eq!(options.prefix, "app:");
        assert_eq!(options.response_timeout, Duration::from_millis(250));
        assert_eq!(options.connect_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_from_config_ignores_falsy_overrides() {
        let overrides = config(&[
            ("host", Value::from("")),
            ("port", Value::Int(0)),
            ("connect_timeout_ms", Value::Null),
            ("scan_count", Value::Bool(false)),
        ]);

        let options = ClientOptions::from_config(Some(&overrides)).unwrap();
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn test_from_config_rejects_wrong_types() {
        let overrides = config(&[("port", Value::from("not-a-port"))]);
        let err = ClientOptions::from_config(Some(&overrides)).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));

        let overrides = config(&[("host", Value::Int(5))]);
        assert!(ClientOptions::from_config(Some(&overrides)).is_err());
    }

    #[test]
    fn test_from_config_rejects_out_of_range_port() {
        let overrides = config(&[("port", Value::Int(70_000))]);
        let err = ClientOptions::from_config(Some(&overrides)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_default_config_round_trips() {
        let defaults = ClientOptions::default_config();
        let options = ClientOptions::from_config(Some(&defaults)).unwrap();
        assert_eq!(options, ClientOptions::default());
    }
}
