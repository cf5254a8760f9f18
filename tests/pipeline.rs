mod common;

use common::{close, l_bus, l_frame, l_ready, p_bus};
use qmc5883::bus::mock::MockBus;
use qmc5883::config::SensorEntry;
use qmc5883::registers::qmc5883l::DATA_X_LSB;
use qmc5883::scheduler::run_stream;
use qmc5883::{
    create_sensor_driver, CalibrationBounds, Declination, Heading, Magnetometer, ReadOptions,
    SensorError,
};

#[tokio::test(start_paused = true)]
async fn calibrated_read_requires_parameters() {
    let bus = l_bus();
    let mut mag = l_ready(&bus).await;
    let options = ReadOptions {
        calibrated: true,
        ..ReadOptions::default()
    };
    assert!(matches!(
        mag.read(options).await,
        Err(SensorError::NotCalibrated { .. })
    ));
    assert_eq!(bus.read_count(DATA_X_LSB), 0);
}

#[tokio::test(start_paused = true)]
async fn smoothing_then_calibration_then_scaling() {
    let bus = l_bus();
    let mut mag = l_ready(&bus).await;
    let bounds = CalibrationBounds::new(-1000, 1000, -500, 500, -2000, 2000);
    mag.set_calibration(bounds.parameters().unwrap());

    for x in [100, 200, 300, 400, 5000] {
        bus.queue_read(DATA_X_LSB, l_frame(x, 100, -400, 2500));
    }
    let reading = mag
        .read(ReadOptions {
            scaled: true,
            calibrated: true,
            smoothed: true,
            smooth_steps: 5,
        })
        .await
        .unwrap();

    // smoothed (300, 100, -400), avg half-range 3500 / 3, then / 3000 LSB/G
    let avg = 3500.0 / 3.0;
    assert!(close(reading.x, 300.0 * avg / 1000.0 / 3000.0));
    assert!(close(reading.y, 100.0 * avg / 500.0 / 3000.0));
    assert!(close(reading.z, -400.0 * avg / 2000.0 / 3000.0));
    assert!(close(reading.temperature.unwrap(), 75.0));
}

#[tokio::test(start_paused = true)]
async fn raw_pipeline_passes_counts_through() {
    let bus = l_bus();
    let mut mag = l_ready(&bus).await;
    bus.queue_read(DATA_X_LSB, l_frame(-7, 8, 9, 100));
    let reading = mag.read(ReadOptions::default()).await.unwrap();
    assert_eq!(reading.axes(), [-7.0, 8.0, 9.0]);
    assert_eq!(reading.temperature, Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn smoothing_needs_three_steps() {
    let bus = l_bus();
    let mut mag = l_ready(&bus).await;
    assert!(matches!(
        mag.read_smoothed(2).await,
        Err(SensorError::InvalidSmoothing { steps: 2 })
    ));
}

#[test]
fn heading_uses_driver_declination() {
    let mut entry = SensorEntry::new("mag0", "qmc5883l");
    let mag = create_sensor_driver(&entry, MockBus::new()).unwrap();
    assert_eq!(mag.heading(1.0, 0.0), Heading { degrees: 0, minutes: 0 });
    assert_eq!(mag.heading(0.0, 1.0), Heading { degrees: 90, minutes: 0 });

    entry.declination.degrees = 5;
    entry.declination.minutes = 37;
    let mag = create_sensor_driver(&entry, MockBus::new()).unwrap();
    assert_eq!(mag.declination(), Declination::new(5, 37).unwrap());
    assert_eq!(mag.heading(1.0, 0.0), Heading { degrees: 5, minutes: 37 });
}

#[tokio::test(start_paused = true)]
async fn stream_keeps_going_after_errors() {
    let mut entry = SensorEntry::new("mag1", "qmc5883p");
    entry.read.calibrated = true;
    let mut mag = create_sensor_driver(&entry, p_bus()).unwrap();
    mag.init().await.unwrap();

    // no calibration stored: every read fails, the loop still runs to the end
    assert_eq!(run_stream(mag.as_mut(), entry.read, 50, Some(3)).await, 0);

    entry.calibration = Some(CalibrationBounds::new(-10, 10, -10, 10, -10, 10));
    let mut mag = create_sensor_driver(&entry, p_bus()).unwrap();
    mag.init().await.unwrap();
    assert_eq!(run_stream(mag.as_mut(), entry.read, 50, Some(3)).await, 3);
}
