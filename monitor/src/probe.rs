use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;

/// Raw values from one physical sensor read: degrees Celsius and percent
/// relative humidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
}

/// Hardware seam for the temperature/humidity sensor.
///
/// `None` means the device produced no data for this attempt, which the
/// DHT22 family does sporadically. Drivers that block on the wire must move
/// the read onto a blocking worker (`tokio::task::spawn_blocking`) inside
/// `sample` so the monitor task is never stalled.
pub trait SensorProbe {
    fn sample(&mut self) -> impl Future<Output = Option<RawSample>> + Send;
}

/// Synthetic probe used when no hardware is attached. Values follow the
/// range of a DHT22 in a room; `dropout` is the probability that a read
/// returns nothing.
pub struct SimulatedProbe {
    rng: StdRng,
    dropout: f64,
}

impl SimulatedProbe {
    pub fn new(dropout: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            dropout: dropout.clamp(0.0, 1.0),
        }
    }
}

impl SensorProbe for SimulatedProbe {
    fn sample(&mut self) -> impl Future<Output = Option<RawSample>> + Send {
        async move {
            if self.rng.gen_bool(self.dropout) {
                return None;
            }

            Some(RawSample {
                temperature_celsius: self.rng.gen_range(15.0..35.0),
                humidity_percent: self.rng.gen_range(30.0..80.0),
            })
        }
    }
}
