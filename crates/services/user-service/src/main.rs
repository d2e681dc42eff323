//! User Service - command line front end for user management.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use common::{AppError, DriverKind, PageRequest, DEFAULT_PAGE_SIZE};
use domain::{CreateUser, UpdateUser};
use user_service_lib::config::{LogFormat, UserServiceConfig};
use user_service_lib::service::{UserManager, UserService};
use user_service_lib::MigrateAction;

/// Failures reported by the command line front end.
#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// One line for stderr: `CODE: message`.
    fn report(&self) -> String {
        match self {
            CliError::App(e) => format!("{}: {}", e.code(), e.user_message()),
            CliError::Output(e) => format!("OUTPUT_ERROR: {}", e),
        }
    }
}

#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "User management backed by PostgreSQL")]
struct Cli {
    /// Storage driver, overrides DB_DRIVER
    #[arg(long, global = true, value_parser = parse_driver)]
    driver: Option<DriverKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Check database connectivity
    Ping,
    /// User management commands
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Get a user by id
    Get { id: i32 },
    /// Get a user by username
    Find { username: String },
    /// List users ordered by id
    List {
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u64,
    },
    /// Change a user's full name
    Update {
        id: i32,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Delete a user
    Delete { id: i32 },
}

fn parse_driver(value: &str) -> Result<DriverKind, String> {
    value.parse().map_err(|e: common::ConfigError| e.to_string())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output stays machine readable
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{}", out);
    Ok(())
}

async fn execute_user_command(
    service: &UserManager,
    action: UserCommands,
) -> Result<(), CliError> {
    match action {
        UserCommands::Create {
            username,
            email,
            full_name,
        } => {
            let cmd = CreateUser {
                username,
                email,
                full_name,
            };
            print_json(&service.create_user(cmd).await?)
        }
        UserCommands::Get { id } => print_json(&service.get_user(id).await?),
        UserCommands::Find { username } => {
            print_json(&service.get_user_by_username(&username).await?)
        }
        UserCommands::List { offset, limit } => {
            print_json(&service.list_users(PageRequest::new(offset, limit)).await?)
        }
        UserCommands::Update { id, full_name } => {
            print_json(&service.update_user(id, UpdateUser { full_name }).await?)
        }
        UserCommands::Delete { id } => {
            service.delete_user(id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_user_command(
    config: &UserServiceConfig,
    action: UserCommands,
) -> Result<(), CliError> {
    let factory = user_service_lib::connect_storage(config).await?;
    let service = user_service_lib::build_service(factory.clone(), config);

    let result = execute_user_command(&service, action).await;

    // Close the pool even when the command failed
    if let Err(e) = factory.close().await {
        tracing::warn!("Failed to close storage pool: {:?}", e);
    }
    result
}

async fn run(cli: Cli, config: UserServiceConfig) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            Ok(user_service_lib::run_migrations(&config, migrate_action).await?)
        }
        Commands::Ping => {
            let factory = user_service_lib::connect_storage(&config).await?;
            let result = factory.ping().await;
            factory.close().await?;
            result?;
            println!("ok ({})", factory.kind());
            Ok(())
        }
        Commands::User { action } => run_user_command(&config, action).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match UserServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(driver) = cli.driver {
        config.driver = driver;
    }

    init_tracing(config.log_format);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.report());
            ExitCode::FAILURE
        }
    }
}
