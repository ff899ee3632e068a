//! Class Fete CLI - backend management tools.
//!
//! # Usage
//!
//! ```bash
//! # Make an existing user an admin
//! classfete-cli admin grant alice@example.com
//!
//! # Remove the role again
//! classfete-cli admin revoke alice@example.com
//!
//! # Show every admin
//! classfete-cli admin list
//!
//! # Create hall-of-fame profiles from a YAML file
//! classfete-cli seed hall-of-fame profiles.yaml
//! ```
//!
//! Reads the same `BACKEND_*` variables as the site (and `.env`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "classfete-cli")]
#[command(author, version, about = "Class Fete CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the admin role
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed backend tables
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to a signed-up user
    Grant {
        /// User email address
        email: String,
    },
    /// Revoke the admin role
    Revoke {
        /// User email address
        email: String,
    },
    /// List admins
    List,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create hall-of-fame profiles from a YAML file
    HallOfFame {
        /// Path to the YAML file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let backend = commands::connect()?;
    match cli.command {
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => {
                commands::admin::grant(&backend, &email).await?;
            }
            AdminAction::Revoke { email } => {
                commands::admin::revoke(&backend, &email).await?;
            }
            AdminAction::List => {
                commands::admin::list(&backend).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::HallOfFame { file } => {
                commands::seed::hall_of_fame(&backend, &file).await?;
            }
        },
    }
    Ok(())
}
