//! Configuration types for the report-scheduler crate
//!
//! This module defines the limits the scheduler enforces: how many subscriptions
//! it tracks, the longest maximum interval a subscriber may negotiate, and how
//! close to a pending report an idle transition may pull it forward.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Configuration for the SynchronizedReportScheduler
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of concurrent subscriptions
    /// Default: 32
    pub node_capacity: usize,

    /// Upper bound on any subscription's maximum interval. Also the horizon used
    /// when searching for the common maximum.
    /// Default: 3600 seconds (60 minutes)
    #[serde(rename = "max_interval_ceiling_ms", with = "duration_ms")]
    pub max_interval_ceiling: Duration,

    /// When the device is about to sleep and a report is due within this window,
    /// the report fires right away instead of waking the device again shortly after.
    /// Default: 1 second
    #[serde(rename = "idle_fire_window_ms", with = "duration_ms")]
    pub idle_fire_window: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            node_capacity: 32,
            max_interval_ceiling: Duration::from_secs(3600), // 60 minutes
            idle_fire_window: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    /// Create a new SchedulerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SchedulerConfig for a battery-powered device that sleeps between reports
    pub fn sleepy_device() -> Self {
        Self {
            node_capacity: 8,
            idle_fire_window: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SchedulerError::Configuration(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.node_capacity == 0 {
            return Err(SchedulerError::Configuration(
                "Node capacity must be greater than 0".to_string(),
            ));
        }

        if u32::try_from(self.node_capacity).is_err() {
            return Err(SchedulerError::Configuration(
                "Node capacity must fit in 32 bits".to_string(),
            ));
        }

        if self.max_interval_ceiling == Duration::ZERO {
            return Err(SchedulerError::Configuration(
                "Max interval ceiling must be greater than 0".to_string(),
            ));
        }

        if self.idle_fire_window >= self.max_interval_ceiling {
            return Err(SchedulerError::Configuration(
                "Idle fire window must be shorter than the max interval ceiling".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        self.node_capacity = capacity;
        self
    }

    pub fn with_max_interval_ceiling(mut self, ceiling: Duration) -> Self {
        self.max_interval_ceiling = ceiling;
        self
    }

    pub fn with_idle_fire_window(mut self, window: Duration) -> Self {
        self.idle_fire_window = window;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
