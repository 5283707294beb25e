use RustedIntegrals::Utils::config::{Args, Config};
use RustedIntegrals::Utils::logger::init_logger;
use RustedIntegrals::api;
use clap::Parser;
use log::info;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load(&args)?;
    init_logger(&config)?;
    info!("configuration: {:?}", config);
    api::serve(&config).await?;
    Ok(())
}
