//! Settings file commands

use crate::config::Config;
use crate::output;
use crate::ConfigCommands;
use anyhow::Result;

pub fn handle_config_command(command: ConfigCommands, config: &mut Config) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let mut shown = config.clone();
            if shown.token.is_some() {
                shown.token = Some("********".to_string());
            }
            println!("# {}", Config::config_path()?.display());
            print!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigCommands::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            output::print_success(&format!("Set {}", key));
        }
    }
    Ok(())
}
