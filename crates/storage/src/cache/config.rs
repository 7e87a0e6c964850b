//! Validated configuration for [`HybridCache`](super::HybridCache).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default interval between background expiration sweeps (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Smallest accepted sweep interval.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Capacity and timing parameters for a [`HybridCache`](super::HybridCache).
///
/// # Validation
///
/// - `capacity` must be >= 1
/// - `trim_target` must be < `capacity` (defaults to 90% of capacity, rounded down, at most
///   `capacity - 1`)
/// - `sweep_interval` must be >= 10ms
///
/// Deserialization runs the same validation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use realmkeep_storage::cache::HybridCacheConfig;
///
/// let config = HybridCacheConfig::builder()
///     .capacity(1_000)
///     .trim_target(900)
///     .sweep_interval(Duration::from_secs(60))
///     .min_live(Duration::from_secs(1))
///     .build()
///     .expect("valid config");
/// assert_eq!(config.trim_target(), 900);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHybridCacheConfig", into = "RawHybridCacheConfig")]
pub struct HybridCacheConfig {
    capacity: usize,
    trim_target: usize,
    sweep_interval: Duration,
    min_live: Duration,
}

#[bon::bon]
impl HybridCacheConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `capacity` is 0
    /// - `trim_target` is not less than `capacity`
    /// - `sweep_interval` is below 10ms
    #[builder]
    pub fn new(
        capacity: usize,
        trim_target: Option<usize>,
        #[builder(default = DEFAULT_SWEEP_INTERVAL)] sweep_interval: Duration,
        #[builder(default)] min_live: Duration,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "capacity",
                value: capacity.to_string(),
                min: "1".to_owned(),
            });
        }
        let trim_target = trim_target.unwrap_or_else(|| default_trim_target(capacity));
        if trim_target >= capacity {
            return Err(ConfigError::InvalidRelation {
                field: "trim_target",
                relation: format!("must be less than capacity ({capacity})"),
                value: trim_target.to_string(),
            });
        }
        if sweep_interval < MIN_SWEEP_INTERVAL {
            return Err(ConfigError::BelowMinimum {
                field: "sweep_interval",
                value: format!("{}ms", sweep_interval.as_millis()),
                min: "10ms".to_owned(),
            });
        }
        Ok(Self { capacity, trim_target, sweep_interval, min_live })
    }

    /// Hard maximum number of resident entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size an eviction pass shrinks the cache to.
    #[must_use]
    pub fn trim_target(&self) -> usize {
        self.trim_target
    }

    /// Interval between background expiration sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Entries younger than this are never chosen for LRU eviction.
    #[must_use]
    pub fn min_live(&self) -> Duration {
        self.min_live
    }
}

fn default_trim_target(capacity: usize) -> usize {
    capacity - (capacity / 10).max(1)
}

/// Unvalidated wire form of [`HybridCacheConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHybridCacheConfig {
    capacity: usize,
    #[serde(default)]
    trim_target: Option<usize>,
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    sweep_interval: Duration,
    #[serde(with = "humantime_serde", default)]
    min_live: Duration,
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

impl TryFrom<RawHybridCacheConfig> for HybridCacheConfig {
    type Error = ConfigError;

    fn try_from(raw: RawHybridCacheConfig) -> Result<Self, Self::Error> {
        Self::builder()
            .capacity(raw.capacity)
            .maybe_trim_target(raw.trim_target)
            .sweep_interval(raw.sweep_interval)
            .min_live(raw.min_live)
            .build()
    }
}

impl From<HybridCacheConfig> for RawHybridCacheConfig {
    fn from(config: HybridCacheConfig) -> Self {
        Self {
            capacity: config.capacity,
            trim_target: Some(config.trim_target),
            sweep_interval: config.sweep_interval,
            min_live: config.min_live,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HybridCacheConfig::builder().capacity(100).build().unwrap();
        assert_eq!(config.capacity(), 100);
        assert_eq!(config.trim_target(), 90);
        assert_eq!(config.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
        assert_eq!(config.min_live(), Duration::ZERO);
    }

    #[test]
    fn test_small_capacity_default_trim_leaves_headroom() {
        let config = HybridCacheConfig::builder().capacity(1).build().unwrap();
        assert_eq!(config.trim_target(), 0);
        let config = HybridCacheConfig::builder().capacity(5).build().unwrap();
        assert_eq!(config.trim_target(), 4);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = HybridCacheConfig::builder().capacity(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::BelowMinimum { field: "capacity", .. }));
    }

    #[test]
    fn test_trim_target_must_be_below_capacity() {
        let err = HybridCacheConfig::builder().capacity(10).trim_target(10).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRelation { field: "trim_target", .. }));
    }

    #[test]
    fn test_sweep_interval_floor() {
        let err = HybridCacheConfig::builder()
            .capacity(10)
            .sweep_interval(Duration::from_millis(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::BelowMinimum { field: "sweep_interval", .. }));
    }

    #[test]
    fn test_deserialize_validates() {
        let config: HybridCacheConfig =
            serde_json::from_str(r#"{"capacity": 50, "sweep_interval": "30s", "min_live": "2s"}"#)
                .unwrap();
        assert_eq!(config.trim_target(), 45);
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.min_live(), Duration::from_secs(2));

        let err = serde_json::from_str::<HybridCacheConfig>(r#"{"capacity": 5, "trim_target": 7}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_serialize_round_trips_through_validation() {
        let config = HybridCacheConfig::builder().capacity(20).trim_target(12).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: HybridCacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
