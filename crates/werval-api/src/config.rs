//! Application configuration
//!
//! Configuration is a tree of TOML values addressed with dotted keys such as
//! `werval.filters.hsts.max_age`. Layers are merged in this order, later
//! layers winning:
//!
//! 1. the embedded reference configuration (`reference.toml`)
//! 2. the application configuration document
//! 3. `WERVAL__*` environment variables, one key each
//!
//! # Examples
//!
//! ```rust
//! use werval_api::Config;
//!
//! let config = Config::reference()
//!     .unwrap()
//!     .with_overrides("[werval.http]\nport = 8080")
//!     .unwrap();
//!
//! assert_eq!(config.int("werval.http.port").unwrap(), 8080);
//! assert_eq!(config.string("werval.http.address").unwrap(), "127.0.0.1");
//! ```

use std::sync::Arc;
use std::time::Duration;

use toml::{Table, Value};

use crate::{Result, WervalError};

const REFERENCE: &str = include_str!("reference.toml");
const ENV_PREFIX: &str = "WERVAL__";

/// Well-known configuration keys
pub mod keys {
    pub const HTTP_ADDRESS: &str = "werval.http.address";
    pub const HTTP_PORT: &str = "werval.http.port";
    pub const HTTP_MAX_BODY_SIZE: &str = "werval.http.max_body_size";
    pub const HTTP_LOG_CONTEXT_REQUEST_ID: &str = "werval.http.log.context.request_id";
    pub const HTTP_LOG_CONTEXT_CLIENT_IP: &str = "werval.http.log.context.client_ip";
    pub const EXECUTORS: &str = "werval.executors";
    pub const EXECUTORS_DEFAULT: &str = "werval.executors.default";
    pub const EXECUTORS_SHUTDOWN_TIMEOUT: &str = "werval.executors.shutdown_timeout";
    pub const FILTERS_X_FRAME_OPTIONS: &str = "werval.filters.x_frame_options.value";
    pub const FILTERS_X_XSS_PROTECTION: &str = "werval.filters.x_xss_protection.value";
    pub const FILTERS_HSTS: &str = "werval.filters.hsts";
    pub const FILTERS_DNT_OPT_IN: &str = "werval.filters.dnt.opt_in";
    pub const FILTERS_CORS_ALLOW_ORIGIN: &str = "werval.filters.cors.allow_origin";
    pub const FILTERS_CORS_ALLOW_CREDENTIALS: &str = "werval.filters.cors.allow_credentials";
    pub const FILTERS_CORS_EXPOSE_HEADERS: &str = "werval.filters.cors.expose_headers";
}

/// Immutable, cheaply cloneable configuration tree
#[derive(Debug, Clone)]
pub struct Config {
    root: Arc<Table>,
}

impl Config {
    /// Empty configuration, every lookup fails
    pub fn empty() -> Self {
        Self {
            root: Arc::new(Table::new()),
        }
    }

    /// The embedded reference configuration
    pub fn reference() -> Result<Self> {
        Self::from_toml_str(REFERENCE)
    }

    /// Parse a TOML document
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let root = toml::from_str::<Table>(document)
            .map_err(|err| WervalError::config("<document>", err.to_string()))?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    /// Reference configuration, overridden by the given application document
    /// and by the process environment
    pub fn load(application: Option<&str>) -> Result<Self> {
        let config = Self::reference()?;
        let config = match application {
            Some(document) => config.with_overrides(document)?,
            None => config,
        };
        Ok(config.with_env_overrides(std::env::vars()))
    }

    /// Deep-merge a TOML document on top of this configuration
    pub fn with_overrides(self, document: &str) -> Result<Self> {
        let overrides = Self::from_toml_str(document)?;
        let mut root = Table::clone(&self.root);
        merge_tables(&mut root, Table::clone(&overrides.root));
        Ok(Self {
            root: Arc::new(root),
        })
    }

    /// Apply `WERVAL__SECTION__KEY=value` variables
    ///
    /// `WERVAL__FILTERS__HSTS__MAX_AGE=30d` overrides
    /// `werval.filters.hsts.max_age`. Values are typed as booleans, integers
    /// or floats when they parse as such, strings otherwise.
    pub fn with_env_overrides<I, K, V>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut root = Table::clone(&self.root);
        for (name, value) in vars {
            let Some(suffix) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let mut path = vec!["werval".to_string()];
            path.extend(
                suffix
                    .split("__")
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_lowercase),
            );
            if path.len() < 2 {
                continue;
            }
            tracing::debug!(key = %path.join("."), "Configuration overridden from environment");
            insert_path(&mut root, &path, typed_env_value(value.as_ref()));
        }
        Self {
            root: Arc::new(root),
        }
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    fn required(&self, key: &str) -> Result<&Value> {
        self.lookup(key)
            .ok_or_else(|| WervalError::config(key, "missing"))
    }

    /// Whether the key is defined
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Keys of the root table, sorted
    pub fn sub_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.root.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// String value; scalars are rendered as strings
    pub fn string(&self, key: &str) -> Result<String> {
        match self.required(key)? {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            _ => Err(WervalError::config(key, "not a string")),
        }
    }

    /// Optional string value
    pub fn string_optional(&self, key: &str) -> Option<String> {
        self.string(key).ok()
    }

    /// List of strings, from an array or a comma separated string
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.required(key)? {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| WervalError::config(key, "array of non-strings"))
                })
                .collect(),
            Value::String(s) => Ok(split_list(s)),
            _ => Err(WervalError::config(key, "not a list")),
        }
    }

    /// Boolean value, also accepting `"true"`/`"false"`/`"yes"`/`"no"` strings
    pub fn bool(&self, key: &str) -> Result<bool> {
        match self.required(key)? {
            Value::Boolean(b) => Ok(*b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(WervalError::config(key, "not a boolean")),
            },
            _ => Err(WervalError::config(key, "not a boolean")),
        }
    }

    /// Boolean value or the given default when missing or malformed
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.bool(key).unwrap_or(default)
    }

    /// Integer value
    pub fn int(&self, key: &str) -> Result<i64> {
        match self.required(key)? {
            Value::Integer(i) => Ok(*i),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| WervalError::config(key, "not an integer")),
            _ => Err(WervalError::config(key, "not an integer")),
        }
    }

    /// Duration value; bare integers count `bare_unit`s
    pub fn duration(&self, key: &str, bare_unit: Duration) -> Result<Duration> {
        match self.required(key)? {
            Value::Integer(i) if *i >= 0 => u32::try_from(*i)
                .ok()
                .and_then(|count| bare_unit.checked_mul(count))
                .ok_or_else(|| WervalError::config(key, "duration out of range")),
            Value::String(s) => {
                parse_duration(s).ok_or_else(|| WervalError::config(key, "not a duration"))
            }
            _ => Err(WervalError::config(key, "not a duration")),
        }
    }

    /// Duration in whole seconds; bare integers are seconds
    pub fn seconds(&self, key: &str) -> Result<u64> {
        self.duration(key, Duration::from_secs(1))
            .map(|d| d.as_secs())
    }

    /// Duration in whole milliseconds; bare integers are milliseconds
    pub fn milliseconds(&self, key: &str) -> Result<u64> {
        self.duration(key, Duration::from_millis(1))
            .map(|d| d.as_millis() as u64)
    }

    /// Sub-tree rooted at the given key
    pub fn object(&self, key: &str) -> Result<Config> {
        match self.required(key)? {
            Value::Table(table) => Ok(Config {
                root: Arc::new(table.clone()),
            }),
            _ => Err(WervalError::config(key, "not an object")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

fn merge_tables(base: &mut Table, overrides: Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn insert_path(table: &mut Table, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        let Value::Table(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.clone(), value);
}

fn typed_env_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::String(raw.to_string())
    }
}

/// Split a comma separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse durations such as `500ms`, `30s`, `5m`, `2h`, `365d`
///
/// A bare number is read as seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (amount, unit) = raw.split_at(split);
    let amount: u64 = amount.parse().ok()?;
    let duration = match unit.trim() {
        "ms" | "millis" | "milliseconds" => Duration::from_millis(amount),
        "" | "s" | "seconds" => Duration::from_secs(amount),
        "m" | "minutes" => Duration::from_secs(amount.checked_mul(60)?),
        "h" | "hours" => Duration::from_secs(amount.checked_mul(60 * 60)?),
        "d" | "days" => Duration::from_secs(amount.checked_mul(60 * 60 * 24)?),
        _ => return None,
    };
    Some(duration)
}
