mod cli;
mod commands;
mod config;
mod error;
mod keys;
mod link;
mod paths;
mod roster;
mod tools;
mod utils;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use colored::*;
use error::{Result, UserError};
use paths::Paths;
use tools::Tools;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if let Err(err) = run(args).await {
        match &err {
            UserError::Usage => {
                let _ = Cli::command().print_help();
            }
            UserError::Other(e) => eprintln!("{} {:#}", "ERROR:".red(), e),
            other => eprintln!("{} {}", "ERROR:".red(), other),
        }
        std::process::exit(err.exit_code());
    }
}

async fn run(args: Cli) -> Result<()> {
    let paths = Paths::new().with_overrides(args.config, args.users, args.keys);
    let tools = Tools::from_env();

    let Some(command) = args.command else {
        return Err(UserError::Usage);
    };

    match command {
        Commands::Show => commands::user::show(&paths)?,
        Commands::Add { username } => commands::user::add(&paths, &tools, &username)?,
        Commands::Remove { username, force } => {
            commands::user::remove(&paths, Some(&username), force)?
        }
        Commands::RemoveAll { force } => commands::user::remove(&paths, None, force)?,
        Commands::Link { username, address } => {
            commands::net::link(&paths, &tools, &username, address).await?
        }
        Commands::GenKeys { force } => commands::keys::generate(&paths, &tools, force)?,
    }

    Ok(())
}
