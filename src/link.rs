use anyhow::{Result, anyhow};

use crate::config::{Inbound, Member};

/// Fixed client fingerprint hint.
const FINGERPRINT: &str = "firefox";

/// Host-side facts a share link needs that are not in the config.
pub struct LinkContext {
    /// Public address clients connect to.
    pub address: String,
    pub public_key: String,
    /// Used in the link label.
    pub hostname: String,
}

/// Build a share link for one member of a reality inbound.
pub fn build_link(inbound: &Inbound, member: &Member, ctx: &LinkContext) -> Result<String> {
    if !inbound.is_reality() {
        return Err(anyhow!(
            "Share links are only available for reality inbounds, not '{}'",
            inbound.protocol()
        ));
    }

    let network = inbound.network();
    let transport = match network {
        "tcp" => "type=tcp&flow=xtls-rprx-vision&encryption=none",
        "xhttp" => "path=%2F&host=&mode=auto&type=xhttp&encryption=none",
        other => return Err(anyhow!("Unsupported network type '{}'", other)),
    };

    let port = inbound
        .port()
        .ok_or_else(|| anyhow!("Inbound '{}/{}' has no usable port", inbound.protocol(), network))?;
    let sni = inbound
        .server_name()
        .ok_or_else(|| anyhow!("Inbound on port {} has no serverNames", port))?;
    let sid = member
        .short_id
        .as_deref()
        .ok_or_else(|| anyhow!("Client '{}' has no shortId", member.client.email))?;

    if member.client.uuid.is_empty() {
        return Err(anyhow!("Client '{}' has no uuid", member.client.email));
    }

    let host = if ctx.address.contains(':') && !ctx.address.contains('[') {
        format!("[{}]", ctx.address)
    } else {
        ctx.address.clone()
    };

    Ok(format!(
        "{}://{}@{}:{}?{}&security=reality&sni={}&fp={}&pbk={}&sid={}&spx=/#{}-{}-{}",
        inbound.protocol(),
        member.client.uuid,
        host,
        port,
        transport,
        sni,
        FINGERPRINT,
        ctx.public_key,
        sid,
        ctx.hostname,
        inbound.protocol(),
        network
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::XrayConfig;
    use crate::roster::enroll;
    use crate::roster::tests::{record, two_inbounds};
    use serde_json::json;
    use std::collections::HashMap;
    use url::Url;

    fn ctx() -> LinkContext {
        LinkContext {
            address: "203.0.113.7".into(),
            public_key: crate::keys::tests::PUBLIC.into(),
            hostname: "node-1".into(),
        }
    }

    fn query(link: &str) -> HashMap<String, String> {
        let url = Url::parse(link).expect("link should parse as URL");
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_tcp_link() {
        let mut config = two_inbounds();
        enroll(&mut config, "alice", &record("u-a", "aaaaaaaaaaaaaaaa"));
        enroll(&mut config, "bob", &record("u-b", "bbbbbbbbbbbbbbbb"));

        let inbound = &config.inbounds[0];
        let member = inbound.member("bob").unwrap();
        let link = build_link(inbound, member, &ctx()).unwrap();

        assert!(link.starts_with("vless://u-b@203.0.113.7:443?"));
        assert!(link.contains("type=tcp&flow=xtls-rprx-vision&encryption=none"));
        assert!(link.ends_with("#node-1-vless-tcp"));

        let q = query(&link);
        assert_eq!(q["security"], "reality");
        assert_eq!(q["sni"], "www.example.com");
        assert_eq!(q["fp"], "firefox");
        assert_eq!(q["pbk"], crate::keys::tests::PUBLIC);
        assert_eq!(q["sid"], "bbbbbbbbbbbbbbbb");
        assert_eq!(q["spx"], "/");
    }

    #[test]
    fn test_xhttp_params_come_first() {
        let mut config = two_inbounds();
        enroll(&mut config, "alice", &record("u-a", "aaaaaaaaaaaaaaaa"));

        let inbound = &config.inbounds[1];
        let link = build_link(inbound, inbound.member("alice").unwrap(), &ctx()).unwrap();

        assert!(link.starts_with(
            "vless://u-a@203.0.113.7:8443?path=%2F&host=&mode=auto&type=xhttp&encryption=none&security=reality"
        ));
        assert!(link.ends_with("#node-1-vless-xhttp"));
        assert_eq!(query(&link)["sni"], "cdn.example.com");
    }

    #[test]
    fn test_ipv6_address_is_bracketed() {
        let mut config = two_inbounds();
        enroll(&mut config, "alice", &record("u-a", "aaaaaaaaaaaaaaaa"));
        let mut ctx = ctx();
        ctx.address = "2001:db8::1".into();

        let inbound = &config.inbounds[0];
        let link = build_link(inbound, inbound.member("alice").unwrap(), &ctx).unwrap();
        assert!(link.starts_with("vless://u-a@[2001:db8::1]:443?"));
    }

    #[test]
    fn test_unknown_network_is_error() {
        let mut config: XrayConfig = serde_json::from_value(json!({
            "inbounds": [{
                "port": 443,
                "protocol": "vless",
                "settings": { "clients": [] },
                "streamSettings": {
                    "network": "grpc",
                    "realitySettings": { "serverNames": ["a.example"], "shortIds": [] }
                }
            }]
        }))
        .unwrap();
        enroll(&mut config, "alice", &record("u-a", "aaaaaaaaaaaaaaaa"));

        let inbound = &config.inbounds[0];
        let err = build_link(inbound, inbound.member("alice").unwrap(), &ctx()).unwrap_err();
        assert!(err.to_string().contains("grpc"));
    }

    #[test]
    fn test_client_without_uuid_is_error() {
        let mut config = two_inbounds();
        enroll(&mut config, "alice", &record("", "aaaaaaaaaaaaaaaa"));

        let inbound = &config.inbounds[0];
        let err = build_link(inbound, inbound.member("alice").unwrap(), &ctx()).unwrap_err();
        assert!(err.to_string().contains("no uuid"));
    }

    #[test]
    fn test_missing_server_names_is_error() {
        let mut config: XrayConfig = serde_json::from_value(json!({
            "inbounds": [{
                "port": 443,
                "protocol": "vless",
                "settings": { "clients": [] },
                "streamSettings": { "network": "tcp", "realitySettings": { "shortIds": [] } }
            }]
        }))
        .unwrap();
        enroll(&mut config, "alice", &record("u-a", "aaaaaaaaaaaaaaaa"));

        let inbound = &config.inbounds[0];
        assert!(build_link(inbound, inbound.member("alice").unwrap(), &ctx()).is_err());
    }
}
