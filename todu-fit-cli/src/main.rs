use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod auto_sync;
mod commands;
mod config;

use app::App;
use auto_sync::try_auto_sync;
use commands::{
    ConfigCommand, MealCommand, MealSubcommand, QuarantineCommand, QuarantineSubcommand,
    QueueCommand, ReminderCommand, ReminderSubcommand, SyncCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "fit")]
#[command(version)]
#[command(about = "Log meals and reminders offline, sync when connected", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log, update and delete meals
    Meal(MealCommand),

    /// Manage reminders
    Reminder(ReminderCommand),

    /// Inspect the offline queue
    Queue(QueueCommand),

    /// Sync queued actions with the remote server
    Sync(SyncCommand),

    /// Retry or discard actions that kept failing
    Quarantine(QuarantineCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fit=info,todu_fit_offline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    // Load configuration
    let config = Config::load(cli.config)?;

    // Config commands never touch the queue
    if let Some(Commands::Config(cmd)) = &cli.command {
        return cmd.run(&config, cli_config_path);
    }
    let Some(command) = &cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let app = App::open(&config).await?;

        execute_command(command, &app, &config).await?;

        // Auto-sync AFTER write commands (only if command succeeded)
        if is_write_command(command) {
            try_auto_sync(&app, &config).await;
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

async fn execute_command(
    command: &Commands,
    app: &App,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Meal(cmd) => cmd.run(app).await?,
        Commands::Reminder(cmd) => cmd.run(app).await?,
        Commands::Queue(cmd) => cmd.run(app).await?,
        Commands::Sync(cmd) => cmd.run(app, config).await?,
        Commands::Quarantine(cmd) => cmd.run(app).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}

/// Returns true if the command queues actions that should sync after execution.
fn is_write_command(cmd: &Commands) -> bool {
    matches!(
        cmd,
        Commands::Meal(m) if matches!(m.command,
            MealSubcommand::Log { .. }
            | MealSubcommand::Update { .. }
            | MealSubcommand::Delete { .. })
    ) || matches!(
        cmd,
        Commands::Reminder(r) if matches!(r.command,
            ReminderSubcommand::Add { .. }
            | ReminderSubcommand::Update { .. }
            | ReminderSubcommand::Delete { .. })
    ) || matches!(
        cmd,
        Commands::Quarantine(q) if matches!(q.command, QuarantineSubcommand::Retry)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command.unwrap()
    }

    #[test]
    fn test_write_commands() {
        assert!(is_write_command(&parse(&[
            "fit", "meal", "log", "Toast", "--type", "breakfast"
        ])));
        assert!(is_write_command(&parse(&[
            "fit", "reminder", "add", "Water", "--time", "10:00", "--days", "mon,tue"
        ])));
        assert!(is_write_command(&parse(&["fit", "quarantine", "retry"])));
    }

    #[test]
    fn test_read_commands() {
        assert!(!is_write_command(&parse(&["fit", "queue", "status"])));
        assert!(!is_write_command(&parse(&["fit", "quarantine", "clear", "--yes"])));
        assert!(!is_write_command(&parse(&["fit", "sync"])));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
