use std::sync::Arc;

use evic_usb::{ConnectionError, hid::HidTransport, monitor::DeviceMonitor};
use log::info;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> Result<(), ConnectionError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let mut monitor = DeviceMonitor::new(Arc::new(HidTransport::new()?));
    let events = monitor.events();
    tokio::pin!(events);

    monitor.start();

    // Print connectivity changes until interrupted.
    while let Some(connected) = events.next().await {
        if connected {
            info!("Plugged in");
        } else {
            info!("Unplugged");
        }
    }

    Ok(())
}
