use evic_usb::{
    ConnectionError,
    commands::{self, dataflash::ReadDataflash},
    hid::HidTransport,
};
use log::info;

fn main() -> Result<(), ConnectionError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let transport = HidTransport::new()?;
    for device in transport.find_devices()? {
        info!("Found {:?} at {}", device.product, device.path);
    }

    let dataflash = commands::run(
        &transport,
        ReadDataflash {
            progress_callback: Some(Box::new(|progress| info!("Reading dataflash: {}%", progress))),
        },
    )?;

    let product_id = dataflash.product_id();
    info!("Product: {} ({})", product_id.name(), product_id);
    info!("Hardware version: {}", dataflash.hardware_version());
    info!("Firmware version: {}", dataflash.firmware_version());
    info!("Boots from alternate ROM: {}", dataflash.load_from_alternate_rom());
    info!("Checksum valid: {}", dataflash.is_checksum_valid());

    Ok(())
}
