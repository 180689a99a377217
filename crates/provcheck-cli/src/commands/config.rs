//! Config command - print the effective configuration.

use std::path::Path;

use provcheck::PipelineConfig;

pub fn run(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::resolve(config)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
