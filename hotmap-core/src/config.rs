use std::time::Duration;

/// Default time-to-live applied to entries when none is configured (30 seconds)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Configuration for a [`Hotmap`](crate::Hotmap)
///
/// # Example
///
/// ```rust
/// use hotmap_core::HotmapConfig;
/// use std::time::Duration;
///
/// let config = HotmapConfig::default()
///     .with_default_ttl(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HotmapConfig {
    /// TTL given to entries stored with `set` (default: 30 seconds)
    pub default_ttl: Duration,
}

impl Default for HotmapConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl HotmapConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default TTL
    ///
    /// A zero TTL is allowed: entries then expire as soon as their watcher
    /// gets scheduled, unless they are read first.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HotmapConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_custom_default_ttl() {
        let config = HotmapConfig::default().with_default_ttl(Duration::from_millis(250));
        assert_eq!(config.default_ttl, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_ttl_is_accepted() {
        let config = HotmapConfig::new().with_default_ttl(Duration::ZERO);
        assert_eq!(config.default_ttl, Duration::ZERO);
    }
}
