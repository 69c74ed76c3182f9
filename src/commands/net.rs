use anyhow::{Context, anyhow};
use colored::*;
use tokio::time::Duration;

use crate::error::{Result, UserError};
use crate::keys::RealityKeys;
use crate::link::{LinkContext, build_link};
use crate::paths::Paths;
use crate::tools::Tools;
use crate::utils::load_config;

const IP_LOOKUP_URL: &str = "https://api.ipify.org";

/// Look up the host's public address; the service answers with one line of
/// text.
async fn detect_public_ip() -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let text = client
        .get(IP_LOOKUP_URL)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Public IP lookup via {} failed", IP_LOOKUP_URL))?
        .text()
        .await?;

    let ip = text.lines().next().unwrap_or_default().trim().to_string();
    if ip.is_empty() {
        return Err(anyhow!("Public IP lookup via {} returned nothing", IP_LOOKUP_URL));
    }
    Ok(ip)
}

/// Print one share link per reality inbound the user belongs to.
pub async fn link(
    paths: &Paths,
    tools: &Tools,
    username: &str,
    address: Option<String>,
) -> Result<()> {
    let config = load_config(&paths.config)?;

    let targets: Vec<_> = config
        .inbounds
        .iter()
        .filter(|i| i.is_reality())
        .filter_map(|i| i.member(username).map(|m| (i, m)))
        .collect();

    if targets.is_empty() {
        return Err(UserError::NotFound(format!(
            "User '{}' was not found in Xray inbounds config",
            username
        )));
    }

    let keys = RealityKeys::load(&paths.keys)?;

    let address = match address {
        Some(addr) => addr,
        None => {
            eprintln!("{} Detecting public IP...", "[INFO]".green());
            detect_public_ip().await?
        }
    };

    let ctx = LinkContext {
        address,
        public_key: keys.public_key,
        hostname: tools.hostname()?,
    };

    for (inbound, member) in targets {
        println!("{}", build_link(inbound, member, &ctx)?);
    }

    Ok(())
}
