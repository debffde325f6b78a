//! `vodcache config` subcommands.

use clap::Subcommand;
use vodcache::config::default_config_path;
use vodcache::ConfigFile;

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the current configuration to the default location
    Init,
}

pub fn run(action: ConfigAction, config: &ConfigFile) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            println!("Config file:   {}", default_config_path()?.display());
            println!("Store:         {}", config.store_directory.display());
            println!("Server bind:   {}", config.server_bind);
            println!("Timeout:       {}s", config.download_timeout_secs);
            println!("Log level:     {}", config.log_level);
            match &config.log_file {
                Some(path) => println!("Log file:      {}", path.display()),
                None => println!("Log file:      (stderr)"),
            }
            Ok(())
        }
        ConfigAction::Init => {
            config.save()?;
            println!("Wrote {}", default_config_path()?.display());
            Ok(())
        }
    }
}
