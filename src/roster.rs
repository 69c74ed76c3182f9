//! Bookkeeping that keeps the live inbound config and the user database in
//! step with each other. Everything here is in-memory; callers load and
//! persist the documents.

use crate::config::{Client, UserDatabase, UserRecord, XrayConfig};

const FLOW_TYPE: &str = "xtls-rprx-vision";

/// Result of comparing the config's clients against the database.
#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    /// Clients in any inbound, first-seen order, no duplicates.
    pub active: Vec<String>,
    /// Database users not referenced by any inbound.
    pub inactive: Vec<String>,
    /// Active clients with no database entry.
    pub missing: Vec<String>,
}

/// What a removal applies to.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    User(&'a str),
    All,
}

pub fn summarize(config: &XrayConfig, users: &UserDatabase) -> Summary {
    let mut active: Vec<String> = Vec::new();
    for inbound in &config.inbounds {
        for member in inbound.members() {
            if !active.contains(&member.client.email) {
                active.push(member.client.email.clone());
            }
        }
    }

    let inactive = users
        .keys()
        .filter(|name| !active.contains(name))
        .cloned()
        .collect();

    let missing = active
        .iter()
        .filter(|name| !users.contains_key(*name))
        .cloned()
        .collect();

    Summary {
        active,
        inactive,
        missing,
    }
}

pub fn is_configured(config: &XrayConfig, username: &str) -> bool {
    config.inbounds.iter().any(|i| i.contains(username))
}

/// `flow` attribute for a client on the given transport.
pub fn flow_for_network(network: &str) -> Option<String> {
    match network {
        "tcp" => Some(FLOW_TYPE.to_string()),
        "xhttp" => Some(String::new()),
        _ => None,
    }
}

/// Add `username` with the stored credentials to every reality inbound.
/// Returns the number of inbounds the user was added to.
pub fn enroll(config: &mut XrayConfig, username: &str, record: &UserRecord) -> usize {
    // Extra database fields ride along, minus keys the client sets itself
    let mut extra = record.other.clone();
    for key in ["email", "uuid", "flow"] {
        extra.remove(key);
    }

    let mut count = 0;
    for inbound in config.inbounds.iter_mut().filter(|i| i.is_reality()) {
        let client = Client {
            email: username.to_string(),
            uuid: record.uuid.clone(),
            flow: flow_for_network(inbound.network()),
            other: extra.clone(),
        };
        inbound.push(client, &record.short_id);
        count += 1;
    }
    count
}

/// Remove the target from every inbound. Returns whether the config changed;
/// clearing everything always counts as a change.
///
/// An inbound that does not hold the user is left untouched, short ids
/// included.
pub fn withdraw(config: &mut XrayConfig, target: Target<'_>) -> bool {
    match target {
        Target::User(username) => {
            let mut removed = false;
            for inbound in config.inbounds.iter_mut() {
                removed |= inbound.remove(username);
            }
            removed
        }
        Target::All => {
            for inbound in config.inbounds.iter_mut() {
                inbound.clear();
            }
            true
        }
    }
}
