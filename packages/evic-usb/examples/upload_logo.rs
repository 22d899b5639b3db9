use std::{env, fs};

use evic_usb::{
    ConnectionError,
    commands::{self, dataflash::ReadDataflash, logo::WriteLogo},
    hid::HidTransport,
};
use log::{error, info};

fn main() -> Result<(), ConnectionError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    // Both blocks are raw monochrome bitmaps of at most 512 bytes.
    let mut args = env::args().skip(1);
    let (Some(block1), Some(block2)) = (args.next(), args.next()) else {
        error!("Usage: upload_logo <block1> <block2>");
        return Ok(());
    };
    let block1 = fs::read(block1).unwrap();
    let block2 = fs::read(block2).unwrap();

    let transport = HidTransport::new()?;

    let product_id = commands::run(&transport, ReadDataflash::default())?.product_id();
    if !product_id.supports_logo_upload() {
        error!("{} does not support logo uploads", product_id.name());
        return Ok(());
    }

    let mut logo = WriteLogo::new(&block1, &block2)?;
    logo.progress_callback = Some(Box::new(|progress| info!("Uploading logo: {}%", progress)));
    commands::run(&transport, logo)?;

    info!("Logo uploaded to {}", product_id.name());

    Ok(())
}
