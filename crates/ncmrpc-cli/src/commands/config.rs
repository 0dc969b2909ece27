//! Print configuration as TOML.

use anyhow::Result;
use ncmrpc::Config;

pub fn run(config: &Config, default: bool) -> Result<()> {
    let text = if default {
        Config::default().to_toml()?
    } else {
        config.to_toml()?
    };
    print!("{}", text);
    Ok(())
}
