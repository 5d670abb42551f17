//! Configuration types for the report-manager crate

use serde::{Deserialize, Serialize};

use report_scheduler::SchedulerConfig;

use crate::error::{ManagerError, Result};

/// Configuration for the ReportManager
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Settings for the underlying scheduler
    pub scheduler: SchedulerConfig,

    /// Most attribute paths carried by a single report message. Larger reports
    /// are split into chunks, each acknowledged before the next one is sent.
    /// Default: 32
    pub max_paths_per_chunk: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            max_paths_per_chunk: 32,
        }
    }
}

impl ManagerConfig {
    /// Create a new ManagerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ManagerConfig for a battery-powered device with small radio frames
    pub fn sleepy_device() -> Self {
        Self {
            scheduler: SchedulerConfig::sleepy_device(),
            max_paths_per_chunk: 8,
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ManagerError::Configuration(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;

        if self.max_paths_per_chunk == 0 {
            return Err(ManagerError::Configuration(
                "Max paths per chunk must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_max_paths_per_chunk(mut self, max: usize) -> Self {
        self.max_paths_per_chunk = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.max_paths_per_chunk, 32);
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let no_chunks = ManagerConfig::new().with_max_paths_per_chunk(0);
        assert!(matches!(
            no_chunks.validate(),
            Err(ManagerError::Configuration(_))
        ));

        let bad_scheduler =
            ManagerConfig::new().with_scheduler(SchedulerConfig::new().with_node_capacity(0));
        assert!(matches!(
            bad_scheduler.validate(),
            Err(ManagerError::Scheduler(_))
        ));
    }

    #[test]
    fn test_config_presets() {
        let sleepy = ManagerConfig::sleepy_device();
        assert_eq!(sleepy.max_paths_per_chunk, 8);
        assert_eq!(sleepy.scheduler.idle_fire_window, Duration::from_secs(5));
        assert!(sleepy.validate().is_ok());
    }

    #[test]
    fn test_from_json_nested() {
        let config = ManagerConfig::from_json(
            r#"{"max_paths_per_chunk": 4, "scheduler": {"node_capacity": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.max_paths_per_chunk, 4);
        assert_eq!(config.scheduler.node_capacity, 2);
        assert_eq!(config.scheduler.max_interval_ceiling, Duration::from_secs(3600));

        assert!(ManagerConfig::from_json(r#"{"max_paths_per_chunk": 0}"#).is_err());
    }
}
