use anyhow::{Context, Result, anyhow};
use std::process::Command;

use crate::config::UserRecord;
use crate::keys::RealityKeys;

/// External binaries the tool delegates to. Each can be overridden through
/// an environment variable (useful for tests and non-standard installs).
pub struct Tools {
    pub xray: String,
    pub openssl: String,
    pub hostname: String,
}

impl Tools {
    pub fn from_env() -> Self {
        Self {
            xray: std::env::var("XRAY_BIN").unwrap_or_else(|_| "xray".to_string()),
            openssl: std::env::var("OPENSSL_BIN").unwrap_or_else(|_| "openssl".to_string()),
            hostname: std::env::var("HOSTNAME_BIN").unwrap_or_else(|_| "hostname".to_string()),
        }
    }

    /// Fresh credentials: a UUID from `xray uuid` and a 16-char short id from
    /// `openssl rand -hex 8`.
    pub fn generate_user(&self) -> Result<UserRecord> {
        let uuid = run(&self.xray, &["uuid"])?;
        if uuid.len() != 36 || uuid::Uuid::parse_str(&uuid).is_err() {
            return Err(anyhow!("'{} uuid' returned an invalid UUID: {:?}", self.xray, uuid));
        }

        let short_id = run(&self.openssl, &["rand", "-hex", "8"])?;
        if short_id.len() != 16 || !short_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!(
                "'{} rand -hex 8' returned an invalid short id: {:?}",
                self.openssl,
                short_id
            ));
        }

        Ok(UserRecord {
            uuid,
            short_id,
            other: Default::default(),
        })
    }

    pub fn generate_keys(&self) -> Result<RealityKeys> {
        let output = run(&self.xray, &["x25519"])?;
        RealityKeys::parse(&output).with_context(|| format!("Unexpected '{} x25519' output", self.xray))
    }

    pub fn hostname(&self) -> Result<String> {
        let name = run(&self.hostname, &[])?;
        if name.is_empty() {
            return Err(anyhow!("'{}' returned an empty hostname", self.hostname));
        }
        Ok(name)
    }
}

/// Run a tool and return its trimmed stdout. A non-zero exit is an error.
fn run(bin: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(bin)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute '{}'", bin))?;

    if !output.status.success() {
        return Err(anyhow!(
            "'{} {}' failed with exit code {}: {}",
            bin,
            args.join(" "),
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("'{}' produced non-UTF-8 output", bin))?;
    Ok(stdout.trim_end().to_string())
}
