use std::time::Duration;

/// Default time a bot spends on a single order.
pub const DEFAULT_PROCESSING_TIME: Duration = Duration::from_secs(10);

const DEFAULT_EVENT_BUFFER: usize = 256;
const DEFAULT_RECENT_COMPLETED_LIMIT: usize = 10;

/// Configuration for the scheduler and the bots it spawns.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long a bot takes to finish one order, regardless of its class.
    pub processing_time: Duration,
    /// Capacity of the bot -> scheduler event channel.
    pub event_buffer: usize,
    /// Number of most recently completed orders kept in status snapshots.
    pub recent_completed_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            processing_time: DEFAULT_PROCESSING_TIME,
            event_buffer: DEFAULT_EVENT_BUFFER,
            recent_completed_limit: DEFAULT_RECENT_COMPLETED_LIMIT,
        }
    }
}

impl SchedulerConfig {
    pub fn new(processing_time: Duration) -> Self {
        Self {
            processing_time,
            ..Default::default()
        }
    }

    pub fn with_processing_ms(mut self, ms: u64) -> Self {
        self.processing_time = Duration::from_millis(ms);
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        // mpsc::channel panics on zero capacity
        self.event_buffer = capacity.max(1);
        self
    }

    pub fn with_recent_completed_limit(mut self, limit: usize) -> Self {
        self.recent_completed_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_default() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.processing_time, Duration::from_secs(10));
        assert_eq!(cfg.event_buffer, 256);
        assert_eq!(cfg.recent_completed_limit, 10);
    }

    #[test]
    fn scheduler_config_new() {
        let cfg = SchedulerConfig::new(Duration::from_millis(250));
        assert_eq!(cfg.processing_time, Duration::from_millis(250));
        assert_eq!(cfg.event_buffer, 256);
    }

    #[test]
    fn scheduler_config_builders() {
        let cfg = SchedulerConfig::default()
            .with_processing_ms(40)
            .with_event_buffer(8)
            .with_recent_completed_limit(3);
        assert_eq!(cfg.processing_time, Duration::from_millis(40));
        assert_eq!(cfg.event_buffer, 8);
        assert_eq!(cfg.recent_completed_limit, 3);
    }

    #[test]
    fn event_buffer_never_zero() {
        let cfg = SchedulerConfig::default().with_event_buffer(0);
        assert_eq!(cfg.event_buffer, 1);
    }
}
