use anyhow::Result;
use std::path::Path;

use crate::cli::ConfigCommands;
use crate::config::Settings;

pub fn run(settings: &Settings, config_path: Option<&Path>, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(&settings.masked())?);
        }
        ConfigCommands::Path => {
            let path = config_path
                .map(Path::to_path_buf)
                .or_else(Settings::default_path);
            match path {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not found)" };
                    println!("{}{}", path.display(), state);
                }
                None => println!("No config directory available on this platform"),
            }
        }
    }
    Ok(())
}
