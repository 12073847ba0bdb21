use crate::metrics::{
    OFFLINE_TRANSITIONS_TOTAL, READS_TOTAL, READ_FAILURES_TOTAL, READ_LATENCY_SECONDS,
};
use crate::model::{Reading, ReadingStatus, SensorStatus};
use crate::probe::{RawSample, SensorProbe};
use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct SensorConfig {
    pub warmup: Duration,
    pub min_read_interval: Duration,
    pub offline_threshold: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(2),
            min_read_interval: Duration::from_secs(2),
            offline_threshold: 3,
        }
    }
}

/// State machine in front of the physical probe: warm-up gating, minimum
/// spacing between hardware reads, one in-call retry, and offline detection
/// after consecutive failed read cycles.
pub struct SensorReader<P> {
    probe: P,
    config: SensorConfig,
    status: SensorStatus,
    initialized: bool,
    last_read_time: Instant,
    consecutive_failures: u32,
}

impl<P: SensorProbe> SensorReader<P> {
    pub fn new(probe: P, config: SensorConfig) -> Self {
        Self {
            probe,
            config,
            status: SensorStatus::WarmingUp,
            initialized: false,
            last_read_time: Instant::now(),
            consecutive_failures: 0,
        }
    }

    pub fn status(&self) -> SensorStatus {
        self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Waits out the remainder of the warm-up window. Idempotent; resolves
    /// immediately once the sensor has already been initialized.
    pub async fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        tokio::time::sleep_until(self.last_read_time + self.config.warmup).await;
        self.initialized = true;
    }

    /// Single entry point for reads. Never fails; every outcome is encoded
    /// in the returned status.
    pub async fn current_reading(&mut self) -> Reading {
        // Inside the spacing window the hardware is never touched
        if self.last_read_time.elapsed() <= self.config.min_read_interval {
            return match self.status {
                SensorStatus::WarmingUp => Reading::status_only(ReadingStatus::WarmingUp),
                _ => {
                    self.status = SensorStatus::Busy;
                    Reading::status_only(ReadingStatus::Busy)
                }
            };
        }

        READS_TOTAL.inc();
        let started = Instant::now();
        let sample = self.sample_with_retry().await;
        READ_LATENCY_SECONDS.observe(started.elapsed().as_secs_f64());

        match sample {
            Some(sample) => self.accept(sample),
            None => self.record_failure(),
        }
    }

    async fn sample_with_retry(&mut self) -> Option<RawSample> {
        match self.probe.sample().await {
            Some(sample) => Some(sample),
            // One immediate retry before the attempt counts as failed
            None => self.probe.sample().await,
        }
    }

    fn accept(&mut self, sample: RawSample) -> Reading {
        self.last_read_time = Instant::now();
        self.status = SensorStatus::Ready;
        self.consecutive_failures = 0;
        Reading::new(
            sample.temperature_celsius,
            sample.humidity_percent,
            Utc::now(),
        )
    }

    fn record_failure(&mut self) -> Reading {
        READ_FAILURES_TOTAL.inc();
        self.consecutive_failures =
            (self.consecutive_failures + 1).min(self.config.offline_threshold);

        if self.consecutive_failures >= self.config.offline_threshold {
            if self.status != SensorStatus::Offline {
                warn!(
                    "sensor offline after {} consecutive failed reads",
                    self.consecutive_failures
                );
                OFFLINE_TRANSITIONS_TOTAL.inc();
            }
            self.status = SensorStatus::Offline;
            Reading::status_only(ReadingStatus::Offline)
        } else {
            debug!(
                "sensor read failed ({} consecutive)",
                self.consecutive_failures
            );
            Reading::status_only(ReadingStatus::Unavailable)
        }
    }
}
