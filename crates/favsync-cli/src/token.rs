use clap::Subcommand;
use favsync_auth::{generate_secret, TokenIssuer};

#[derive(Debug, Subcommand)]
pub(crate) enum TokenCommands {
    /// Issue a bearer token for the configured username
    Issue {
        #[arg(long)]
        username: String,
        #[arg(long)]
        secret_word: String,
    },
    /// Generate a random signing secret for FAVSYNC_JWT_SECRET
    Secret {
        #[arg(long, default_value_t = 32)]
        length: usize,
    },
}

pub(crate) fn run_token_command(command: TokenCommands) -> anyhow::Result<()> {
    match command {
        TokenCommands::Issue {
            username,
            secret_word,
        } => {
            let config = favsync_core::load_app_config()?;
            let issuer = TokenIssuer::new(
                config.require_jwt_secret()?,
                config.username.clone(),
                config.require_auth_secret_word()?,
            );
            let issued = issuer.issue(&username, &secret_word)?;
            println!("{}", issued.token);
            eprintln!("expires {}", issued.expires_at.to_rfc3339());
        }
        TokenCommands::Secret { length } => {
            anyhow::ensure!(length >= 16, "secret length must be at least 16");
            println!("{}", generate_secret(length));
        }
    }
    Ok(())
}
