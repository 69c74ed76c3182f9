use colored::*;

use crate::error::{Result, UserError};
use crate::paths::Paths;
use crate::tools::Tools;
use crate::utils::{load_config, save_config, write_secret};

/// Generate a reality keypair, write the key file and put the private key
/// into every reality inbound.
pub fn generate(paths: &Paths, tools: &Tools, force: bool) -> Result<()> {
    if paths.keys.exists() && !force {
        return Err(UserError::Conflict(format!(
            "Key file {:?} already exists; use --force to replace it",
            paths.keys
        )));
    }

    let mut config = load_config(&paths.config)?;

    eprintln!("{} Generating reality keypair...", "[INFO]".green());
    let keys = tools.generate_keys()?;

    let mut updated = 0;
    for inbound in config.inbounds.iter_mut().filter(|i| i.is_reality()) {
        if inbound.set_private_key(&keys.private_key) {
            updated += 1;
        } else {
            eprintln!(
                "{} '{}/{}' inbound has no realitySettings; skipped.",
                "[WARN]".yellow(),
                inbound.protocol(),
                inbound.network()
            );
        }
    }

    // Key file last: it only appears once the config already holds the key
    save_config(&paths.config, &config)?;
    write_secret(&paths.keys, &keys.to_text())?;

    eprintln!(
        "{} Keypair written to {:?}; private key set on {} inbound(s).",
        "[INFO]".green(),
        paths.keys,
        updated
    );
    println!("{}", keys.public_key);

    Ok(())
}
