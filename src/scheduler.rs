use crate::sensors::{Freshness, MagReading, Magnetometer, ReadOptions};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

/// Streaming rate when the sensor entry sets none
pub const DEFAULT_FREQUENCY: u32 = 10;

/// Highest streaming rate a config may ask for
pub const MAX_FREQUENCY: u32 = 1000;

/// Never zero; `interval` rejects a zero period.
fn period(frequency: u32) -> Duration {
    Duration::from_micros((1_000_000 / u64::from(frequency.max(1))).max(1))
}

fn log_reading(id: &str, reading: &MagReading, mag: &dyn Magnetometer, options: &ReadOptions) {
    let heading = mag.heading(reading.x, reading.y);
    let unit = if options.scaled { "G" } else { "" };
    match reading.temperature {
        Some(t) => info!(
            "[{}] x={:.3}{unit} y={:.3}{unit} z={:.3}{unit} t={:.2} heading={}",
            id, reading.x, reading.y, reading.z, t, heading
        ),
        None => info!(
            "[{}] x={:.3}{unit} y={:.3}{unit} z={:.3}{unit} heading={}",
            id, reading.x, reading.y, reading.z, heading
        ),
    }
}

/// Read `mag` at `frequency` Hz and log each reading with its heading.
///
/// Read errors are logged and the loop carries on. Runs forever unless
/// `max_samples` is set; returns the number of successful readings.
pub async fn run_stream(
    mag: &mut dyn Magnetometer,
    options: ReadOptions,
    frequency: u32,
    max_samples: Option<u64>,
) -> u64 {
    let id = mag.id().to_string();
    info!("[{}] Starting stream at {}Hz", id, frequency);

    let mut ticker = interval(period(frequency));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts = 0u64;
    let mut delivered = 0u64;
    loop {
        if max_samples.is_some_and(|max| attempts >= max) {
            break;
        }
        ticker.tick().await;
        attempts += 1;

        match mag.read(options).await {
            Ok(reading) => {
                if reading.freshness == Freshness::Stale {
                    warn!("[{}] reading is stale", id);
                }
                log_reading(&id, &reading, &*mag, &options);
                delivered += 1;
            }
            Err(e) => error!("[{}] Sensor read error: {}", id, e),
        }
    }
    delivered
}
