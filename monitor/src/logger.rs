use crate::errors::{Error, Result};
use crate::metrics::{
    LOGGING_ACTIVE, LOG_TICKS_TOTAL, MEASUREMENTS_LOGGED_TOTAL, STORAGE_FAILURES_TOTAL,
};
use crate::model::{AlarmThresholds, Event, Reading, StatusSnapshot, TempUnit};
use crate::probe::SensorProbe;
use crate::sensor::SensorReader;
use crate::session::ReadingSession;
use crate::store::SqliteStore;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Commands accepted over the monitor's mailbox
#[derive(Debug)]
pub enum Command {
    ReadNow {
        respond_to: oneshot::Sender<Reading>,
    },
    EnableLogging,
    DisableLogging,
    /// Bounds arrive in the current display unit
    SetThresholds { thresholds: AlarmThresholds },
    ToggleUnit {
        respond_to: oneshot::Sender<TempUnit>,
    },
    Snapshot {
        respond_to: oneshot::Sender<StatusSnapshot>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_count: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(15),
            max_count: 30,
        }
    }
}

/// One logging run: counts restart on enable and on reaching `max_count`
struct LogRun {
    interval: Duration,
    count: u32,
    max_count: u32,
    active: bool,
}

/// The monitor actor: sole owner of the sensor, the session, and the
/// logging run. Commands and ticks are serialized through its loop, so no
/// sensor or run state is ever touched concurrently.
pub struct Logger<P> {
    reader: SensorReader<P>,
    session: ReadingSession,
    store: SqliteStore,
    events: broadcast::Sender<Event>,
    config: LogConfig,
    run: LogRun,
    next_tick: Option<Instant>,
}

impl<P: SensorProbe> Logger<P> {
    pub fn new(
        reader: SensorReader<P>,
        session: ReadingSession,
        store: SqliteStore,
        events: broadcast::Sender<Event>,
        config: LogConfig,
    ) -> Self {
        Self {
            reader,
            session,
            store,
            events,
            config,
            run: LogRun {
                interval: config.interval,
                count: 0,
                max_count: config.max_count,
                active: false,
            },
            next_tick: None,
        }
    }

    /// Actor loop. Exits when every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.reader.initialize().await;
        info!("Sensor warmed up and ready");

        loop {
            let tick_at = self.next_tick.unwrap_or_else(Instant::now);
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(tick_at), if self.next_tick.is_some() => {
                    self.tick().await;
                }
            }
        }

        info!("Monitor stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::ReadNow { respond_to } => {
                let reading = self.read().await;
                let _ = respond_to.send(reading);
            }
            Command::EnableLogging => self.enable_logging(),
            Command::DisableLogging => self.disable_logging(),
            Command::SetThresholds { thresholds } => {
                self.session.set_thresholds(thresholds);
                debug!("Alarm thresholds updated: {:?}", self.session.thresholds());
            }
            Command::ToggleUnit { respond_to } => {
                let unit = self.session.toggle_unit();
                info!("Display unit switched to {:?}", unit);
                let _ = respond_to.send(unit);
            }
            Command::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    /// One read through the sensor, recorded and published
    async fn read(&mut self) -> Reading {
        let reading = self.reader.current_reading().await;
        self.session.record(&reading);
        if reading.is_new() {
            let _ = self.events.send(Event::NewReading {
                reading: reading.clone(),
            });
        }
        reading
    }

    fn enable_logging(&mut self) {
        // Re-enabling always restarts the run from zero
        self.run.count = 0;
        self.run.active = true;
        self.next_tick = Some(Instant::now() + self.config.initial_delay);
        LOGGING_ACTIVE.set(1.0);
        let _ = self.events.send(Event::LoggingChanged { active: true });
        info!(
            "Logging enabled: every {:?}, {} measurements max",
            self.run.interval, self.run.max_count
        );
    }

    fn disable_logging(&mut self) {
        self.run.active = false;
        self.run.count = 0;
        self.next_tick = None;
        LOGGING_ACTIVE.set(0.0);
        let _ = self.events.send(Event::LoggingChanged { active: false });
        info!("Logging disabled");
    }

    /// One scheduled logging cycle: read, persist a New reading (values are
    /// already canonical Celsius), advance the count whether or not the
    /// read or the insert succeeded.
    async fn tick(&mut self) {
        LOG_TICKS_TOTAL.inc();
        let _ = self.events.send(Event::ReadNowAvailable { available: false });

        let reading = self.read().await;
        if let (Some(temperature), Some(humidity), Some(timestamp)) = (
            reading.temperature_celsius,
            reading.humidity_percent,
            reading.timestamp,
        ) {
            match self.store.append(temperature, humidity, timestamp).await {
                Ok(id) => {
                    MEASUREMENTS_LOGGED_TOTAL.inc();
                    debug!(
                        "Logged measurement {} ({:.1}C, {:.1}%)",
                        id, temperature, humidity
                    );
                }
                Err(e) => {
                    STORAGE_FAILURES_TOTAL.inc();
                    error!("Failed to store measurement: {}", e);
                }
            }
        } else {
            debug!("Tick read returned {:?}, nothing stored", reading.status);
        }

        // A failed read still consumes a logging slot
        self.run.count += 1;

        if self.run.count >= self.run.max_count {
            info!("Reached {} ticks, stopping", self.run.max_count);
            self.disable_logging();
        } else if self.run.active {
            self.next_tick = Some(Instant::now() + self.run.interval);
        } else {
            // A run stopped mid-flight is never rescheduled
            self.next_tick = None;
        }

        let _ = self.events.send(Event::ReadNowAvailable { available: true });
    }

    fn snapshot(&self) -> StatusSnapshot {
        let latest = self.session.display_latest();
        StatusSnapshot {
            sensor_status: self.reader.status(),
            system_status: self.session.system_status(),
            unit: self.session.unit(),
            logging_active: self.run.active,
            logging_count: self.run.count,
            thresholds: self.session.display_thresholds(),
            temperature: latest.map(|(temperature, _, _)| temperature),
            humidity: latest.map(|(_, humidity, _)| humidity),
            last_read_at: latest.map(|(_, _, timestamp)| timestamp),
        }
    }
}

/// Cloneable handle for transport callers; wraps the mailbox and the
/// per-request reply channels.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
}

impl MonitorHandle {
    pub fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    pub async fn read_now(&self) -> Result<Reading> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ReadNow { respond_to: tx }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub async fn enable_logging(&self) -> Result<()> {
        self.send(Command::EnableLogging).await
    }

    pub async fn disable_logging(&self) -> Result<()> {
        self.send(Command::DisableLogging).await
    }

    pub async fn set_thresholds(&self, thresholds: AlarmThresholds) -> Result<()> {
        self.send(Command::SetThresholds { thresholds }).await
    }

    pub async fn toggle_unit(&self) -> Result<TempUnit> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ToggleUnit { respond_to: tx }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub async fn snapshot(&self) -> Result<StatusSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot { respond_to: tx }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReadingStatus;
    use crate::probe::RawSample;
    use crate::sensor::SensorConfig;
    use std::future::Future;

    struct StaticProbe {
        fail: bool,
    }

    impl SensorProbe for StaticProbe {
        fn sample(&mut self) -> impl Future<Output = Option<RawSample>> + Send {
            let sample = (!self.fail).then_some(RawSample {
                temperature_celsius: 22.0,
                humidity_percent: 50.0,
            });
            async move { sample }
        }
    }

    fn test_thresholds() -> AlarmThresholds {
        AlarmThresholds {
            temp_high: 28.0,
            temp_low: 0.0,
            humidity_high: 80.0,
            humidity_low: 15.0,
        }
    }

    async fn test_logger(fail: bool, max_count: u32) -> (Logger<StaticProbe>, broadcast::Receiver<Event>) {
        let sensor_config = SensorConfig {
            warmup: Duration::ZERO,
            min_read_interval: Duration::ZERO,
            offline_threshold: 3,
        };
        let reader = SensorReader::new(StaticProbe { fail }, sensor_config);
        let store = SqliteStore::open("sqlite::memory:")
            .await
            .expect("open in-memory store");
        let (events, events_rx) = broadcast::channel(64);
        let config = LogConfig {
            initial_delay: Duration::from_millis(1),
            interval: Duration::from_millis(1),
            max_count,
        };
        let logger = Logger::new(
            reader,
            ReadingSession::new(test_thresholds()),
            store,
            events,
            config,
        );
        (logger, events_rx)
    }

    #[tokio::test]
    async fn test_auto_stop_after_max_count_ticks() {
        let (mut logger, _events) = test_logger(false, 3).await;

        logger.enable_logging();
        for _ in 0..3 {
            logger.tick().await;
        }

        assert!(!logger.run.active);
        assert_eq!(logger.run.count, 0);
        assert!(logger.next_tick.is_none());

        let rows = logger.store.get_last(10).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[tokio::test]
    async fn test_failed_reads_still_consume_slots() {
        let (mut logger, _events) = test_logger(true, 3).await;

        logger.enable_logging();
        for _ in 0..3 {
            logger.tick().await;
        }

        // Three failed ticks exhausted the run without storing anything
        assert!(!logger.run.active);
        assert!(logger.store.get_last(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disable_clears_pending_tick_and_count() {
        let (mut logger, _events) = test_logger(false, 30).await;

        logger.enable_logging();
        logger.tick().await;
        assert_eq!(logger.run.count, 1);
        assert!(logger.next_tick.is_some());

        logger.disable_logging();
        assert!(!logger.run.active);
        assert_eq!(logger.run.count, 0);
        assert!(logger.next_tick.is_none());
    }

    #[tokio::test]
    async fn test_reenable_restarts_count_at_zero() {
        let (mut logger, _events) = test_logger(false, 30).await;

        logger.enable_logging();
        logger.tick().await;
        logger.tick().await;
        assert_eq!(logger.run.count, 2);

        logger.enable_logging();
        assert_eq!(logger.run.count, 0);
        assert!(logger.run.active);
    }

    #[tokio::test]
    async fn test_tick_event_sequence() {
        let (mut logger, mut events) = test_logger(false, 30).await;

        logger.enable_logging();
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::LoggingChanged { active: true }
        ));

        logger.tick().await;
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::ReadNowAvailable { available: false }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::NewReading { .. }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::ReadNowAvailable { available: true }
        ));
    }

    #[tokio::test]
    async fn test_snapshot_reflects_session_state() {
        let (mut logger, _events) = test_logger(false, 30).await;

        logger.enable_logging();
        logger.tick().await;

        let snapshot = logger.snapshot();
        assert!(snapshot.logging_active);
        assert_eq!(snapshot.logging_count, 1);
        assert_eq!(snapshot.temperature, Some(22.0));
        assert_eq!(snapshot.humidity, Some(50.0));
        assert_eq!(
            snapshot.system_status,
            crate::model::SystemStatus::Good
        );
    }

    #[tokio::test]
    async fn test_read_now_does_not_consume_a_slot() {
        let (mut logger, _events) = test_logger(false, 30).await;

        logger.enable_logging();
        let reading = logger.read().await;
        assert_eq!(reading.status, ReadingStatus::New);
        assert_eq!(logger.run.count, 0);
        assert!(logger.store.get_last(10).await.unwrap().is_empty());
    }
}
