use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::Config;

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

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# fit configuration

# Directory for the offline queue (default: platform data dir + /fit)
# data_dir: ~/.local/share/fit

# Queue storage: file or sqlite
storage: file

sync:
  # Base URL of the REST API; leave unset to stay offline
  # server_url: "http://localhost:8080"
  health_path: /health
  auto_sync: false

queue:
  backoff_base_ms: 1000
  backoff_max_ms: 300000
  jitter: true
  action_timeout_ms: 30000
  default_priority: 5
  max_retries: 3
  # retry or quarantine
  client_errors: retry
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
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

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!("storage: {}", config.storage.value);
                        println!("  source: {}", config.storage.source);
                        println!();

                        println!(
                            "sync.server_url: {}",
                            config.sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("sync.auto_sync: {}", config.sync.auto_sync);
                        println!();

                        let queue = &config.queue;
                        println!(
                            "queue.backoff: {}ms base, {}ms max, jitter {}",
                            queue.backoff_base_ms, queue.backoff_max_ms, queue.jitter
                        );
                        println!("queue.action_timeout_ms: {}", queue.action_timeout_ms);
                        println!("queue.max_retries: {}", queue.max_retries);
                        println!("queue.client_errors: {:?}", queue.client_errors);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'fit config show' to view current configuration.");
                    return Ok(());
                }

                // Create parent directory
                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}
