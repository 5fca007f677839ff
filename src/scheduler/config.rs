//! Configuration for the scheduler module

use serde::{Deserialize, Serialize};

use crate::pattern::{PatternError, PatternResult};
use crate::timer::TimerConfig;

/// Configuration for a [`Scheduler`](super::Scheduler)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA timezone name patterns are evaluated in (e.g. "UTC",
    /// "America/New_York")
    pub timezone: String,

    /// Whether the second field takes part in matching; when false a pattern
    /// fires on every matching minute regardless of its second field
    pub match_second: bool,

    /// Whether the year field takes part in matching
    pub match_year: bool,

    /// Daemon mode: `stop` never waits for in-flight tasks, regardless of the
    /// `wait` argument
    pub daemon: bool,

    /// Underlying timer wheel settings
    pub timer: TimerConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            match_second: true,
            match_year: true,
            daemon: false,
            timer: TimerConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Resolve the configured timezone name
    pub fn resolve_timezone(&self) -> PatternResult<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| PatternError::UnknownTimezone(self.timezone.clone()))
    }
}

/// Builder for [`SchedulerConfig`]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.config.timezone = timezone.into();
        self
    }

    pub fn match_second(mut self, enabled: bool) -> Self {
        self.config.match_second = enabled;
        self
    }

    pub fn match_year(mut self, enabled: bool) -> Self {
        self.config.match_year = enabled;
        self
    }

    pub fn daemon(mut self, enabled: bool) -> Self {
        self.config.daemon = enabled;
        self
    }

    pub fn timer(mut self, timer: TimerConfig) -> Self {
        self.config.timer = timer;
        self
    }

    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
