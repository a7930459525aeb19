//! Prometheus-compatible metrics endpoint
//!
//! Exposes engine metrics in Prometheus text format and JSON.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::game::performance::PerformanceMonitor;
use crate::game::state::FrameSnapshot;

const TICK_HISTORY: usize = 1000;

/// Metrics registry for the engine
#[derive(Debug)]
pub struct EngineMetrics {
    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // 0=Excellent .. 4=Catastrophic
    pub performance_status: AtomicU64,
    pub budget_usage_percent: AtomicU64,

    // Field
    pub obstacle_count: AtomicU64,
    pub power_up_count: AtomicU64,
    pub bots_alive: AtomicU64,
    pub run_score: AtomicU64,
    pub run_time_seconds: AtomicU64,

    // Lifecycle
    pub runs_started: AtomicU64,
    pub runs_ended: AtomicU64,

    // Persistence
    pub persistence_writes: AtomicU64,
    pub persistence_failures: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            performance_status: AtomicU64::new(0),
            budget_usage_percent: AtomicU64::new(0),
            obstacle_count: AtomicU64::new(0),
            power_up_count: AtomicU64::new(0),
            bots_alive: AtomicU64::new(0),
            run_score: AtomicU64::new(0),
            run_time_seconds: AtomicU64::new(0),
            runs_started: AtomicU64::new(0),
            runs_ended: AtomicU64::new(0),
            persistence_writes: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Copy field gauges from the latest frame
    pub fn record_frame(&self, frame: &FrameSnapshot) {
        self.obstacle_count.store(frame.obstacles.len() as u64, Ordering::Relaxed);
        self.power_up_count.store(frame.power_ups.len() as u64, Ordering::Relaxed);
        self.bots_alive
            .store(frame.bots.iter().filter(|b| b.alive).count() as u64, Ordering::Relaxed);
        self.run_score.store(frame.economy.score.max(0.0) as u64, Ordering::Relaxed);
        self.run_time_seconds.store(frame.elapsed_secs as u64, Ordering::Relaxed);
    }

    pub fn record_performance(&self, monitor: &PerformanceMonitor) {
        self.performance_status.store(monitor.status().as_level(), Ordering::Relaxed);
        self.budget_usage_percent
            .store(monitor.budget_usage_percent() as u64, Ordering::Relaxed);
    }

    pub fn record_write(&self, ok: bool) {
        if ok {
            self.persistence_writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.persistence_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn status_name(&self) -> &'static str {
        match self.performance_status.load(Ordering::Relaxed) {
            0 => "excellent",
            1 => "good",
            2 => "warning",
            3 => "critical",
            _ => "catastrophic",
        }
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("lane_runner_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("lane_runner_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("lane_runner_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("lane_runner_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("lane_runner_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        metric!("lane_runner_performance_status", "Performance status (0=Excellent, 4=Catastrophic)", "gauge",
            self.performance_status.load(Ordering::Relaxed));
        metric!("lane_runner_budget_usage_percent", "Tick budget usage percentage", "gauge",
            self.budget_usage_percent.load(Ordering::Relaxed));
        output.push_str(&format!(
            "# HELP lane_runner_performance_state Human-readable performance state\n# TYPE lane_runner_performance_state gauge\nlane_runner_performance_state{{state=\"{}\"}} 1\n",
            self.status_name()
        ));

        metric!("lane_runner_obstacles", "Obstacles on the field", "gauge",
            self.obstacle_count.load(Ordering::Relaxed));
        metric!("lane_runner_power_ups", "Power-ups on the field", "gauge",
            self.power_up_count.load(Ordering::Relaxed));
        metric!("lane_runner_bots_alive", "Living bots", "gauge",
            self.bots_alive.load(Ordering::Relaxed));
        metric!("lane_runner_run_score", "Score of the current run", "gauge",
            self.run_score.load(Ordering::Relaxed));
        metric!("lane_runner_run_time_seconds", "Elapsed time of the current run", "gauge",
            self.run_time_seconds.load(Ordering::Relaxed));

        metric!("lane_runner_runs_started_total", "Runs started", "counter",
            self.runs_started.load(Ordering::Relaxed));
        metric!("lane_runner_runs_ended_total", "Runs ended", "counter",
            self.runs_ended.load(Ordering::Relaxed));

        metric!("lane_runner_persistence_writes_total", "Successful profile writes", "counter",
            self.persistence_writes.load(Ordering::Relaxed));
        metric!("lane_runner_persistence_failures_total", "Failed profile writes", "counter",
            self.persistence_failures.load(Ordering::Relaxed));

        metric!("lane_runner_uptime_seconds", "Engine uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        let value = serde_json::json!({
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
                "status": self.performance_status.load(Ordering::Relaxed),
                "status_name": self.status_name(),
                "budget_percent": self.budget_usage_percent.load(Ordering::Relaxed),
            },
            "field": {
                "obstacles": self.obstacle_count.load(Ordering::Relaxed),
                "power_ups": self.power_up_count.load(Ordering::Relaxed),
                "bots_alive": self.bots_alive.load(Ordering::Relaxed),
            },
            "run": {
                "score": self.run_score.load(Ordering::Relaxed),
                "time_seconds": self.run_time_seconds.load(Ordering::Relaxed),
                "started": self.runs_started.load(Ordering::Relaxed),
                "ended": self.runs_ended.load(Ordering::Relaxed),
            },
            "persistence": {
                "writes": self.persistence_writes.load(Ordering::Relaxed),
                "failures": self.persistence_failures.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_default()
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<EngineMetrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    // JSON routes first; "/metrics" is a prefix of "/metrics/json"
                    let response = if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
                        http_response("application/json", &metrics.to_json())
                    } else if request.starts_with("GET /metrics") {
                        http_response("text/plain; version=0.0.4", &metrics.to_prometheus())
                    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
                        http_response("text/plain", "OK")
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
