use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::config::{UserDatabase, XrayConfig};

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let value =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(value)
}

/// Write pretty JSON (4-space indent) through a sibling temp file and rename it
/// over `path`, so readers never observe a half-written document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');

    replace_file(path, &buf, 0o644)
}

/// Like `write_json`, for key material: owner-only permissions.
pub fn write_secret(path: &Path, text: &str) -> Result<()> {
    replace_file(path, text.as_bytes(), 0o600)
}

fn replace_file(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(&tmp)
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    drop(file);

    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

pub fn load_config(path: &Path) -> Result<XrayConfig> {
    load_json(path)
}

pub fn save_config(path: &Path, config: &XrayConfig) -> Result<()> {
    write_json(path, config)
}

/// A missing database file is an empty database.
pub fn load_users(path: &Path) -> Result<UserDatabase> {
    if !path.exists() {
        return Ok(UserDatabase::new());
    }
    load_json(path)
}

pub fn save_users(path: &Path, users: &UserDatabase) -> Result<()> {
    write_json(path, users)
}
