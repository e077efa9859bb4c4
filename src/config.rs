//! Process-wide serving configuration.

use crate::error::{Error, Result};
use crate::observability::TtlPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default page size when the request omits it.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound a request's page size is clamped to.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Default name of the response header carrying the total record count.
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

const ENV_PREFIX: &str = "RESOURCE_KIT_";

/// Settings shared by every orchestrator and router in the process.
///
/// Loaded once at start-up and then only read.
///
/// # Example
///
/// ```
/// use resource_kit::config::ServeConfig;
///
/// let config = ServeConfig::default()
///     .with_max_page_size(100)
///     .with_tag_ttl("generos", 300);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServeConfig {
    /// Header name for the total record count on list responses.
    pub total_count_header: String,

    /// Page size used when the request does not give one.
    pub default_page_size: u32,

    /// Largest page size honoured; larger requests are clamped.
    pub max_page_size: u32,

    /// Expiry of cached reads in seconds. 0 = entries only leave by eviction.
    pub cache_ttl_secs: u64,

    /// Per-tag expiry overrides in seconds. 0 has the same meaning as for
    /// `cache_ttl_secs`.
    pub tag_ttl_secs: HashMap<String, u64>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            total_count_header: TOTAL_COUNT_HEADER.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            cache_ttl_secs: 60,
            tag_ttl_secs: HashMap::new(),
        }
    }
}

impl ServeConfig {
    pub fn with_total_count_header(mut self, header: impl Into<String>) -> Self {
        self.total_count_header = header.into();
        self
    }

    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Override the expiry for one resource tag.
    pub fn with_tag_ttl(mut self, tag: impl Into<String>, secs: u64) -> Self {
        self.tag_ttl_secs.insert(tag.into(), secs);
        self
    }

    /// Load from `RESOURCE_KIT_*` environment variables on top of the defaults.
    ///
    /// Recognised: `TOTAL_COUNT_HEADER`, `DEFAULT_PAGE_SIZE`, `MAX_PAGE_SIZE`,
    /// `CACHE_TTL_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if a variable does not parse or the
    /// resulting configuration fails [`ServeConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` on malformed JSON or invalid settings.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ServeConfig = serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let mut config = ServeConfig::default();

        if let Some(header) = var("TOTAL_COUNT_HEADER") {
            config.total_count_header = header;
        }
        if let Some(raw) = var("DEFAULT_PAGE_SIZE") {
            config.default_page_size = parse_var("DEFAULT_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = var("MAX_PAGE_SIZE") {
            config.max_page_size = parse_var("MAX_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = var("CACHE_TTL_SECS") {
            config.cache_ttl_secs = parse_var("CACHE_TTL_SECS", &raw)?;
        }

        config.validate()?;
        debug!(
            "ServeConfig loaded: page size {} (max {}), ttl {}s",
            config.default_page_size, config.max_page_size, config.cache_ttl_secs
        );
        Ok(config)
    }

    /// Reject settings that cannot serve a request.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(Error::ConfigError(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(Error::ConfigError(format!(
                "default_page_size {} must be between 1 and max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.total_count_header.is_empty()
            || !self
                .total_count_header
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(Error::ConfigError(format!(
                "invalid total_count_header '{}'",
                self.total_count_header
            )));
        }
        Ok(())
    }

    /// Process-wide TTL policy derived from `cache_ttl_secs`.
    pub fn ttl_policy(&self) -> TtlPolicy {
        policy_from_secs(self.cache_ttl_secs)
    }

    /// Expiry override configured for `tag`, if any.
    pub fn tag_ttl(&self, tag: &str) -> Option<TtlPolicy> {
        self.tag_ttl_secs.get(tag).copied().map(policy_from_secs)
    }
}

fn policy_from_secs(secs: u64) -> TtlPolicy {
    match secs {
        0 => TtlPolicy::Infinite,
        secs => TtlPolicy::Fixed(Duration::from_secs(secs)),
    }
}

fn parse_var<V: std::str::FromStr>(name: &str, raw: &str) -> Result<V> {
    raw.trim().parse().map_err(|_| {
        Error::ConfigError(format!(
            "{}{} must be a non-negative integer, got '{}'",
            ENV_PREFIX, name, raw
        ))
    })
}
