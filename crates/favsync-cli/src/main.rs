mod favourites;
mod token;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::favourites::OutputFormat;
use crate::token::TokenCommands;

#[derive(Debug, Parser)]
#[command(name = "favsync-cli")]
#[command(about = "favsync command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract favourites now and print them without persisting
    Scrape {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Extract from a saved HTML document instead of rendering the profile
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Run the full sync and replace the stored snapshot
    Sync,
    /// Print the stored snapshot
    Show {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Bearer token administration
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Database administration
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Scrape { format, html_file }) => {
            let config = favsync_core::load_app_config()?;
            favourites::run_scrape(&config, format, html_file.as_deref()).await?;
        }
        Some(Commands::Sync) => {
            let config = favsync_core::load_app_config()?;
            favourites::run_sync(&config).await?;
        }
        Some(Commands::Show { format }) => {
            let config = favsync_core::load_app_config()?;
            favourites::run_show(&config, format).await?;
        }
        Some(Commands::Token { command }) => token::run_token_command(command)?,
        Some(Commands::Db { command }) => {
            let config = favsync_core::load_app_config()?;
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    favsync_db::health_check(&pool).await?;
                    println!("database reachable");
                }
                DbCommands::Migrate => {
                    let applied = favsync_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
        None => println!("favsync-cli: run with --help for available commands"),
    }

    Ok(())
}

pub(crate) async fn connect(config: &favsync_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = favsync_db::PoolConfig::from_app_config(config);
    let pool = favsync_db::connect_pool(config.require_database_url()?, pool_config).await?;
    Ok(pool)
}
