//! Tick budget monitoring
//!
//! Tracks simulation tick durations against the frame budget so the driver
//! can report degradation and the metrics endpoint can expose it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Performance status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PerformanceStatus {
    /// Under 30% of the tick budget
    Excellent,
    Good,
    /// Approaching the budget
    Warning,
    /// At or slightly over the budget; frames will be skipped
    Critical,
    /// Sustained overload
    Catastrophic,
}

impl PerformanceStatus {
    /// Frames are at risk of being skipped
    pub fn is_degraded(&self) -> bool {
        *self >= PerformanceStatus::Warning
    }

    /// Numeric level for gauges (0 = excellent)
    pub fn as_level(&self) -> u64 {
        *self as u64
    }
}

/// Rolling monitor of tick durations
pub struct PerformanceMonitor {
    tick_durations: VecDeque<Duration>,
    max_samples: usize,
    /// Target tick duration (budget)
    target_tick_duration: Duration,
    excellent_threshold: f32,
    warning_threshold: f32,
    critical_threshold: f32,
    catastrophic_threshold: f32,
    status: PerformanceStatus,
    tick_start: Option<Instant>,
    /// Obstacles + power-ups + bots at last measurement
    last_entity_count: usize,
}

impl PerformanceMonitor {
    pub fn new(tick_rate: u32) -> Self {
        let target_tick_duration = Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32);
        // ~2 seconds of samples
        let max_samples = (tick_rate.max(1) * 2) as usize;

        Self {
            tick_durations: VecDeque::with_capacity(max_samples),
            max_samples,
            target_tick_duration,
            excellent_threshold: 0.3,
            warning_threshold: 0.7,
            critical_threshold: 0.9,
            catastrophic_threshold: 1.5,
            status: PerformanceStatus::Excellent,
            tick_start: None,
            last_entity_count: 0,
        }
    }

    /// Start timing a tick
    pub fn tick_start(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// End timing a tick and return the measured duration
    pub fn tick_end(&mut self, entity_count: usize) -> Option<Duration> {
        let start = self.tick_start.take()?;
        let duration = start.elapsed();
        self.record_tick(duration);
        self.last_entity_count = entity_count;
        Some(duration)
    }

    fn record_tick(&mut self, duration: Duration) {
        self.tick_durations.push_back(duration);
        while self.tick_durations.len() > self.max_samples {
            self.tick_durations.pop_front();
        }
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.tick_durations.len() < 10 {
            return;
        }

        let ratio = self.average_tick_duration().as_secs_f32() / self.target_tick_duration.as_secs_f32();

        self.status = if ratio < self.excellent_threshold {
            PerformanceStatus::Excellent
        } else if ratio < self.warning_threshold {
            PerformanceStatus::Good
        } else if ratio < self.critical_threshold {
            PerformanceStatus::Warning
        } else if ratio < self.catastrophic_threshold {
            PerformanceStatus::Critical
        } else {
            PerformanceStatus::Catastrophic
        };
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.tick_durations.iter().sum();
        sum / self.tick_durations.len() as u32
    }

    /// Tick duration at the given percentile (0.0 - 1.0)
    pub fn percentile(&self, p: f32) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.tick_durations.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * p.clamp(0.0, 1.0)) as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied().unwrap_or(Duration::ZERO)
    }

    pub fn p95_tick_duration(&self) -> Duration {
        self.percentile(0.95)
    }

    pub fn p99_tick_duration(&self) -> Duration {
        self.percentile(0.99)
    }

    pub fn max_tick_duration(&self) -> Duration {
        self.tick_durations.iter().max().copied().unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> PerformanceStatus {
        self.status
    }

    /// Budget usage as percentage (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        (self.average_tick_duration().as_secs_f32() / self.target_tick_duration.as_secs_f32()) * 100.0
    }

    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, {} entities",
            self.status,
            self.budget_usage_percent(),
            self.last_entity_count
        )
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor_with(ms: u64) -> PerformanceMonitor {
        let mut monitor = PerformanceMonitor::new(60);
        for _ in 0..20 {
            monitor.record_tick(Duration::from_millis(ms));
        }
        monitor
    }

    #[test]
    fn test_performance_monitor_new() {
        let monitor = PerformanceMonitor::new(60);
        assert_eq!(monitor.status(), PerformanceStatus::Excellent);
        assert_eq!(monitor.max_samples, 120);
    }

    #[test]
    fn test_status_levels() {
        // Budget is ~16.67ms at 60Hz
        assert_eq!(monitor_with(2).status(), PerformanceStatus::Excellent);
        assert_eq!(monitor_with(8).status(), PerformanceStatus::Good);
        assert_eq!(monitor_with(13).status(), PerformanceStatus::Warning);
        assert_eq!(monitor_with(18).status(), PerformanceStatus::Critical);
        assert_eq!(monitor_with(30).status(), PerformanceStatus::Catastrophic);
    }

    #[test]
    fn test_degraded() {
        assert!(!monitor_with(8).status().is_degraded());
        assert!(monitor_with(13).status().is_degraded());
        assert!(monitor_with(30).status().is_degraded());
    }

    #[test]
    fn test_needs_ten_samples() {
        let mut monitor = PerformanceMonitor::new(60);
        for _ in 0..9 {
            monitor.record_tick(Duration::from_millis(30));
        }
        assert_eq!(monitor.status(), PerformanceStatus::Excellent);
        monitor.record_tick(Duration::from_millis(30));
        assert_eq!(monitor.status(), PerformanceStatus::Catastrophic);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut monitor = PerformanceMonitor::new(30);
        for _ in 0..500 {
            monitor.record_tick(Duration::from_millis(1));
        }
        assert_eq!(monitor.tick_durations.len(), 60);
    }

    #[test]
    fn test_percentiles() {
        let mut monitor = PerformanceMonitor::new(60);
        for ms in 1..=100 {
            monitor.record_tick(Duration::from_millis(ms));
        }
        assert_eq!(monitor.max_tick_duration(), Duration::from_millis(100));
        let p95 = monitor.p95_tick_duration();
        assert!(p95 >= Duration::from_millis(95) && p95 <= Duration::from_millis(96));
        let p99 = monitor.p99_tick_duration();
        assert!(p99 >= Duration::from_millis(99));
        assert!(monitor.average_tick_duration() < p95);
    }

    #[test]
    fn test_tick_timing() {
        let mut monitor = PerformanceMonitor::new(60);
        assert!(monitor.tick_end(3).is_none());
        monitor.tick_start();
        std::thread::sleep(Duration::from_millis(1));
        let measured = monitor.tick_end(10);

        assert!(measured.is_some());
        assert!(!monitor.tick_durations.is_empty());
        assert_eq!(monitor.last_entity_count(), 10);
    }
}
