//! RealmGate - directory-backed authentication
//!
//! Operator tool for checking credentials, group-to-role mappings and
//! directory connectivity against a configured LDAP realm.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use realmgate_auth::DirectoryAuthProvider;
use realmgate_core::config::LoggingConfig;
use realmgate_core::RealmGateConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "realmgate")]
#[command(author = "RealmGate Team")]
#[command(version = realmgate_core::VERSION)]
#[command(about = "Directory-backed authentication and role mapping", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REALMGATE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "REALMGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a principal's password against the directory
    Authenticate {
        /// Principal to authenticate
        principal: String,

        /// Password
        #[arg(long, env = "REALMGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the roles and permissions of a principal
    Roles {
        /// Principal to look up
        principal: String,
    },

    /// Export every user with its groups and roles as JSON
    Users,

    /// Check that the directory server is reachable
    TestConnection,

    /// Validate and print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load or create config
    let mut config = match &cli.config {
        Some(path) => RealmGateConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => RealmGateConfig::default(),
    };
    config.apply_env();

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(&config.logging);

    let ctx = CommandContext {
        output_format: cli.output,
    };

    if let Commands::CheckConfig = cli.command {
        return commands::check_config::execute(&ctx, &config);
    }

    config.validate().context("Invalid configuration")?;
    let provider = DirectoryAuthProvider::from_config(&config);

    match cli.command {
        Commands::Authenticate {
            principal,
            password,
        } => commands::authenticate::execute(&ctx, &provider, &principal, password).await,
        Commands::Roles { principal } => {
            commands::roles::execute(&ctx, &provider, &principal).await
        }
        Commands::Users => commands::users::execute(&provider).await,
        Commands::TestConnection => commands::test_connection::execute(&ctx, &provider).await,
        Commands::CheckConfig => Ok(()),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Logs go to stderr so command output stays parseable
    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
