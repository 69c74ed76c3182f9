use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use std::fs;
use std::path::Path;

/// Length of a 32-byte key in unpadded base64.
const KEY_LEN: usize = 43;

/// Reality key material as printed by `xray x25519`.
#[derive(Debug, Clone, PartialEq)]
pub struct RealityKeys {
    pub private_key: String,
    /// Printed by xray under the `Password` label.
    pub public_key: String,
    pub hash32: String,
}

impl RealityKeys {
    /// Parse `Key: value` lines. All three keys are required and must each be
    /// a 43-character unpadded URL-safe base64 encoding of 32 bytes.
    pub fn parse(text: &str) -> Result<Self> {
        let mut private_key = None;
        let mut public_key = None;
        let mut hash32 = None;

        for line in text.lines() {
            if let Some(val) = line.strip_prefix("PrivateKey: ") {
                private_key = Some(val.trim().to_string());
            } else if let Some(val) = line.strip_prefix("Password: ") {
                public_key = Some(val.trim().to_string());
            } else if let Some(val) = line.strip_prefix("Hash32: ") {
                hash32 = Some(val.trim().to_string());
            }
        }

        let keys = Self {
            private_key: require("PrivateKey", private_key)?,
            public_key: require("Password", public_key)?,
            hash32: require("Hash32", hash32)?,
        };
        Ok(keys)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {:?}", path))?;
        Self::parse(&text).with_context(|| format!("Invalid key file {:?}", path))
    }

    pub fn to_text(&self) -> String {
        format!(
            "PrivateKey: {}\nPassword: {}\nHash32: {}\n",
            self.private_key, self.public_key, self.hash32
        )
    }
}

fn require(label: &str, value: Option<String>) -> Result<String> {
    let value = value.ok_or_else(|| anyhow!("'{}' is missing", label))?;
    if value.len() != KEY_LEN {
        return Err(anyhow!(
            "'{}' has length {} (expected {})",
            label,
            value.len(),
            KEY_LEN
        ));
    }
    let decoded = general_purpose::URL_SAFE_NO_PAD
        .decode(&value)
        .map_err(|e| anyhow!("'{}' is not valid base64: {}", label, e))?;
    if decoded.len() != 32 {
        return Err(anyhow!(
            "'{}' decodes to {} bytes (expected 32)",
            label,
            decoded.len()
        ));
    }
    Ok(value)
}
