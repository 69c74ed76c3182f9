use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xray-user")]
#[command(about = "Manage users of an Xray VLESS+Reality server", long_about = None)]
pub struct Cli {
    /// Xray config file (default: /usr/local/etc/xray/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// User database file (default: /usr/local/etc/xray/.users.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub users: Option<PathBuf>,

    /// Reality key file (default: /usr/local/etc/xray/.keys)
    #[arg(long, global = true, value_name = "FILE")]
    pub keys: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// An empty name would address nobody; `remove-all` is the way to clear.
fn non_empty_username(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("username must not be empty (use remove-all to clear every user)".into());
    }
    Ok(s.to_string())
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show active and inactive users
    #[command(visible_aliases = ["ls"])]
    Show,

    /// Add a user to every reality inbound, restoring stored credentials if any
    Add {
        #[arg(value_parser = non_empty_username)]
        username: String,
    },

    /// Remove a user from the inbounds, keeping their credentials
    #[command(visible_aliases = ["rm"])]
    Remove {
        #[arg(value_parser = non_empty_username)]
        username: String,

        /// Remove from the user database as well
        #[arg(short, long)]
        force: bool,
    },

    /// Remove all users from the inbounds, keeping their credentials
    #[command(visible_aliases = ["rm-all"])]
    RemoveAll {
        /// Clear the user database as well
        #[arg(short, long)]
        force: bool,
    },

    /// Print share links for a user
    #[command(visible_aliases = ["show-link"])]
    Link {
        #[arg(value_parser = non_empty_username)]
        username: String,

        /// Server address to put in the link (auto-detected if omitted)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Generate a reality keypair and apply the private key to the config
    #[command(visible_aliases = ["keys"])]
    GenKeys {
        /// Replace an existing key file
        #[arg(short, long)]
        force: bool,
    },
}
