use clap::{Args, Subcommand};

use crate::config;

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand, Clone)]
enum ConfigSubcommand {
    /// Validate the config file and its profiles.
    Check {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Print the resolved config file path.
    Path,
}

pub fn run(args: ConfigArgs) -> Result<(), String> {
    match args.command {
        ConfigSubcommand::Check { profile } => {
            let report = config::validate_config(profile.as_deref())?;
            println!("config OK: {}", report.path.display());
            if !report.profiles.is_empty() {
                println!("profiles: {}", report.profiles.join(", "));
            }
            Ok(())
        }
        ConfigSubcommand::Path => {
            println!("{}", config::config_path()?.display());
            Ok(())
        }
    }
}
