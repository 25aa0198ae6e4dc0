//! Aula CLI - Database migrations and administrator provisioning.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! aula-cli migrate
//!
//! # Provision an administrator
//! aula-cli admin create -e admin@aula.academy -r super_admin -p all
//!
//! # Inspect and manage administrators
//! aula-cli admin list
//! aula-cli admin deactivate admin@aula.academy
//! aula-cli admin grant admin@aula.academy manage_blog,manage_courses
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin` - Create, list, activate, deactivate and grant administrators

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "aula-cli")]
#[command(author, version, about = "Aula admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admin database migrations
    Migrate,
    /// Manage administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Provision a new administrator
    Create {
        /// Administrator email address (must exist at the identity provider)
        #[arg(short, long)]
        email: String,

        /// Role (`super_admin`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Comma separated permissions, or `all`
        #[arg(short, long, default_value = "")]
        permissions: String,
    },
    /// List administrators
    List,
    /// Re-enable a disabled administrator
    Activate {
        /// Administrator email address
        email: String,
    },
    /// Disable an administrator (blocks login and existing sessions)
    Deactivate {
        /// Administrator email address
        email: String,
    },
    /// Add permissions to an administrator
    Grant {
        /// Administrator email address
        email: String,

        /// Comma separated permissions, or `all`
        permissions: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::admin().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                role,
                permissions,
            } => commands::admin::create(&email, &role, &permissions).await?,
            AdminAction::List => commands::admin::list().await?,
            AdminAction::Activate { email } => commands::admin::set_active(&email, true).await?,
            AdminAction::Deactivate { email } => {
                commands::admin::set_active(&email, false).await?;
            }
            AdminAction::Grant { email, permissions } => {
                commands::admin::grant(&email, &permissions).await?;
            }
        },
    }
    Ok(())
}
