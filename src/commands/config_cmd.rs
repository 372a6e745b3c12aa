use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::{mask, Config};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!(
                            "server_url: {}",
                            config.server_url.value.as_deref().unwrap_or("(not set)")
                        );
                        println!("  source: {}", config.server_url.source);

                        let key = config
                            .api_key
                            .value
                            .as_deref()
                            .map(mask)
                            .unwrap_or_else(|| "(not set)".to_string());
                        println!("api_key: {}", key);
                        println!("  source: {}", config.api_key.source);

                        println!("export_dir: {}", config.export_dir.value.display());
                        println!("  source: {}", config.export_dir.source);

                        println!("sync_timeout_secs: {}", config.sync_timeout_secs.value);
                        println!("  source: {}", config.sync_timeout_secs.source);
                    }
                }
                Ok(())
            }
        }
    }
}
