//! `gatekeeper`: barrier controller binary.
//!
//! Configuration comes from `GATEKEEPER_*` environment variables. The servo
//! and the status panel are console-backed; the presence sensor is fed from
//! stdin, one line per change (`1` vehicle present, `0` clear), which makes
//! the binary usable on a bench against a real verification service.

use anyhow::{Context, Result};
use gatekeeper_controller::GateController;
use gatekeeper_core::GateConfig;
use gatekeeper_hardware::console::{ConsolePanel, ConsoleServo};
use gatekeeper_hardware::devices::{AnyPanel, AnyServo};
use gatekeeper_hardware::mock::{MockSensor, MockSensorHandle};
use gatekeeper_network::AnyChannel;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = GateConfig::from_env().context("invalid configuration")?;
    info!(version = gatekeeper_core::VERSION, binding = ?config.binding, "Starting gatekeeper");

    // Seeded clear.
    let (sensor, sensor_handle) = MockSensor::new(config.sensor_active_low);
    let channel = AnyChannel::from_config(&config).context("failed to set up verification channel")?;
    let servo = AnyServo::Console(ConsoleServo::new(config.servo_pin));
    let panel = AnyPanel::Console(ConsolePanel::new(config.display_address));

    let mut controller = GateController::new(&config, sensor, channel, servo, panel)?;
    controller.initialize().await;

    tokio::spawn(feed_presence(sensor_handle, config.sensor_active_low));

    let stats = controller
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C, stopping");
            }
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Translate stdin lines into raw sensor levels.
async fn feed_presence(handle: MockSensorHandle, active_low: bool) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "1" => handle.set_level(!active_low),
                "0" => handle.set_level(active_low),
                "" => {}
                other => warn!(input = other, "Expected 1 (present) or 0 (clear)"),
            },
            Ok(None) => {
                info!("Presence input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Presence input failed");
                break;
            }
        }
    }
}
