use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_sensor_reads_total",
        "Total physical sensor read cycles"
    ))
    .unwrap();
    pub static ref READ_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_sensor_read_failures_total",
        "Read cycles where both attempts returned no data"
    ))
    .unwrap();
    pub static ref OFFLINE_TRANSITIONS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_sensor_offline_transitions_total",
        "Times the sensor was declared offline"
    ))
    .unwrap();
    pub static ref LOG_TICKS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_log_ticks_total",
        "Logging ticks fired"
    ))
    .unwrap();
    pub static ref MEASUREMENTS_LOGGED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_measurements_logged_total",
        "Measurements persisted to the store"
    ))
    .unwrap();
    pub static ref STORAGE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "monitor_storage_failures_total",
        "Failed measurement inserts"
    ))
    .unwrap();
    pub static ref LOGGING_ACTIVE: Gauge = Gauge::with_opts(Opts::new(
        "monitor_logging_active",
        "Whether periodic logging is currently running"
    ))
    .unwrap();
    pub static ref READ_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "monitor_sensor_read_latency_seconds",
            "Time taken by one sensor read cycle"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(READS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(READ_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(OFFLINE_TRANSITIONS_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(LOG_TICKS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(MEASUREMENTS_LOGGED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(STORAGE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(LOGGING_ACTIVE.clone())).unwrap();
    REGISTRY
        .register(Box::new(READ_LATENCY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
