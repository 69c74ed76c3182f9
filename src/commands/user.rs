use colored::*;

use crate::error::{Result, UserError};
use crate::paths::Paths;
use crate::roster::{self, Target};
use crate::tools::Tools;
use crate::utils::{load_config, load_users, save_config, save_users};

pub fn show(paths: &Paths) -> Result<()> {
    let config = load_config(&paths.config)?;
    let users = load_users(&paths.users)?;

    let summary = roster::summarize(&config, &users);
    println!("Active clients: {}", summary.active.join(", "));
    println!("Inactive users: {}", summary.inactive.join(", "));

    if !summary.missing.is_empty() {
        return Err(UserError::Inconsistent {
            database: paths.users.display().to_string(),
            users: summary.missing,
        });
    }
    Ok(())
}

pub fn add(paths: &Paths, tools: &Tools, username: &str) -> Result<()> {
    let mut config = load_config(&paths.config)?;

    if roster::is_configured(&config, username) {
        return Err(UserError::Conflict(format!(
            "User '{}' already configured",
            username
        )));
    }

    let mut users = load_users(&paths.users)?;
    let record = match users.get(username) {
        Some(existing) => {
            eprintln!("{} Restoring user '{}'", "[INFO]".green(), username);
            existing.clone()
        }
        None => {
            eprintln!("{} Creating new user '{}'", "[INFO]".green(), username);
            let fresh = tools.generate_user()?;
            users.insert(username.to_string(), fresh.clone());
            // Credentials hit the disk before the config references them
            save_users(&paths.users, &users)?;
            fresh
        }
    };

    let count = roster::enroll(&mut config, username, &record);
    if count == 0 {
        eprintln!(
            "{} No reality inbound found; '{}' is stored but not enrolled.",
            "[WARN]".yellow(),
            username
        );
    }

    save_config(&paths.config, &config)?;

    eprintln!(
        "{} User '{}' added to {} inbound(s)",
        "[INFO]".green(),
        username,
        count
    );
    println!("uuid: {}\nsid: {}", record.uuid, record.short_id);

    Ok(())
}

/// Remove one user (`Some`) or everyone (`None`) from the inbounds; with
/// `force` the stored credentials go as well.
pub fn remove(paths: &Paths, username: Option<&str>, force: bool) -> Result<()> {
    let mut config = load_config(&paths.config)?;

    let target = match username {
        Some(name) => Target::User(name),
        None => Target::All,
    };

    if roster::withdraw(&mut config, target) {
        save_config(&paths.config, &config)?;
        match target {
            Target::User(name) => {
                eprintln!("{} User '{}' was removed from inbounds", "[INFO]".green(), name)
            }
            Target::All => eprintln!("{} All users were removed from inbounds", "[INFO]".green()),
        }
    } else if !force {
        return Err(UserError::NotFound(format!(
            "User '{}' was not found in Xray inbounds config",
            username.unwrap_or_default()
        )));
    } else if let Target::User(name) = target {
        eprintln!(
            "{} User '{}' was not found in inbounds",
            "[WARN]".yellow(),
            name
        );
    }

    if !force {
        return Ok(());
    }

    let mut users = load_users(&paths.users)?;
    match target {
        Target::User(name) => {
            if users.remove(name).is_none() {
                return Err(UserError::NotFound(format!(
                    "User '{}' was not found in database",
                    name
                )));
            }
            eprintln!("{} User '{}' was removed from database", "[INFO]".green(), name);
        }
        Target::All => {
            users.clear();
            eprintln!("{} All users were removed from database", "[INFO]".green());
        }
    }
    save_users(&paths.users, &users)?;

    Ok(())
}
