//! Marketplace CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! mkt-cli migrate
//!
//! # Promote an account so it can sign in as a vendor
//! mkt-cli account set-kind -e seller@example.com -k vendor
//!
//! # Show an account and its vendor profile, if any
//! mkt-cli account show -e seller@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `account set-kind` - Change an account's kind (`user` or `vendor`)
//! - `account show` - Print an account summary

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mkt-cli")]
#[command(author, version, about = "Marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Change the kind of an account
    SetKind {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New kind (`user`, `vendor`)
        #[arg(short, long)]
        kind: String,
    },
    /// Show an account
    Show {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Account { action } => match action {
            AccountAction::SetKind { email, kind } => {
                commands::account::set_kind(&email, &kind).await?;
            }
            AccountAction::Show { email } => {
                let summary = commands::account::show(&email).await?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{summary}");
                }
            }
        },
    }
    Ok(())
}
