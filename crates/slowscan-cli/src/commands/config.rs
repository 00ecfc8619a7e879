//! Settings inspection command.

use clap::{Args, Subcommand};
use slowscan_config::{Settings, settings_path};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the settings in effect as TOML
    Show {
        /// Read this file instead of the user settings
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Print where the user settings file is read from
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show { settings: None }) {
        ConfigCommand::Show { settings } => {
            let settings = match settings {
                Some(path) => Settings::load(path)?,
                None => Settings::load_or_default()?,
            };
            print!("{}", settings.to_toml()?);
        }
        ConfigCommand::Path => {
            let path = settings_path();
            let note = if path.is_file() { "" } else { " (not present, defaults apply)" };
            println!("{}{}", path.display(), note);
        }
    }
    Ok(())
}
