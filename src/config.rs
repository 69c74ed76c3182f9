use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Protocol whose inbounds carry one reality short id per client.
pub const REALITY_PROTOCOL: &str = "vless";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct XrayConfig {
    #[serde(default)]
    pub inbounds: Vec<Inbound>,

    // Capture other fields to avoid losing data when serializing back
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Client {
    pub email: String,

    // Trojan/vmess clients carry `password`/`id` instead; those stay in `other`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A client together with the short id it is paired with.
///
/// On disk the two live in separate lists (`settings.clients` and
/// `realitySettings.shortIds`) correlated only by position. In memory they
/// are kept as one record so that inserts and removals cannot misalign them.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub client: Client,
    /// Always `Some` for reality inbounds, `None` otherwise.
    pub short_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(try_from = "WireInbound", into = "WireInbound")]
pub struct Inbound {
    // Wire form with the member lists taken out
    shape: WireInbound,
    members: Vec<Member>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireInbound {
    protocol: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<Value>,

    settings: InboundSettings,

    #[serde(rename = "streamSettings")]
    stream_settings: StreamSettings,

    #[serde(flatten)]
    other: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
struct InboundSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clients: Option<Vec<Client>>,

    #[serde(flatten)]
    other: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct StreamSettings {
    network: String,

    #[serde(
        rename = "realitySettings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    reality_settings: Option<RealitySettings>,

    #[serde(flatten)]
    other: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
struct RealitySettings {
    #[serde(rename = "privateKey", default, skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,

    #[serde(rename = "serverNames", default, skip_serializing_if = "Vec::is_empty")]
    server_names: Vec<String>,

    #[serde(rename = "shortIds", default)]
    short_ids: Vec<String>,

    #[serde(flatten)]
    other: Map<String, Value>,
}

impl TryFrom<WireInbound> for Inbound {
    type Error = String;

    fn try_from(mut wire: WireInbound) -> Result<Self, Self::Error> {
        // Leaves `Some(vec![])` behind so a present-but-empty list is written back
        let clients = wire
            .settings
            .clients
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default();

        if wire.protocol != REALITY_PROTOCOL {
            let members = clients
                .into_iter()
                .map(|client| Member {
                    client,
                    short_id: None,
                })
                .collect();
            return Ok(Self {
                shape: wire,
                members,
            });
        }

        let short_ids = wire
            .stream_settings
            .reality_settings
            .as_mut()
            .map(|r| std::mem::take(&mut r.short_ids))
            .unwrap_or_default();

        if short_ids.len() != clients.len() {
            return Err(format!(
                "Incorrect '{}' inbound: {} clients but {} shortIds (counts must match)",
                wire.protocol,
                clients.len(),
                short_ids.len()
            ));
        }

        let members = clients
            .into_iter()
            .zip(short_ids)
            .map(|(client, sid)| Member {
                client,
                short_id: Some(sid),
            })
            .collect();

        Ok(Self {
            shape: wire,
            members,
        })
    }
}

impl From<Inbound> for WireInbound {
    fn from(inbound: Inbound) -> Self {
        let Inbound { mut shape, members } = inbound;
        let paired = shape.protocol == REALITY_PROTOCOL;

        let mut clients = Vec::with_capacity(members.len());
        let mut short_ids = Vec::with_capacity(members.len());
        for member in members {
            if let Some(sid) = member.short_id {
                short_ids.push(sid);
            }
            clients.push(member.client);
        }
        if !clients.is_empty() || shape.settings.clients.is_some() {
            shape.settings.clients = Some(clients);
        }

        if paired {
            match shape.stream_settings.reality_settings.as_mut() {
                Some(reality) => reality.short_ids = short_ids,
                None if !short_ids.is_empty() => {
                    shape.stream_settings.reality_settings = Some(RealitySettings {
                        short_ids,
                        ..Default::default()
                    });
                }
                None => {}
            }
        }

        shape
    }
}

impl Inbound {
    pub fn protocol(&self) -> &str {
        &self.shape.protocol
    }

    pub fn network(&self) -> &str {
        &self.shape.stream_settings.network
    }

    /// Listening port, accepting both numeric and string forms.
    pub fn port(&self) -> Option<u16> {
        match self.shape.port.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn server_name(&self) -> Option<&str> {
        self.shape
            .stream_settings
            .reality_settings
            .as_ref()
            .and_then(|r| r.server_names.first())
            .map(String::as_str)
    }

    pub fn is_reality(&self) -> bool {
        self.shape.protocol == REALITY_PROTOCOL
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, email: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.client.email == email)
    }

    pub fn contains(&self, email: &str) -> bool {
        self.member(email).is_some()
    }

    /// Append a client; the short id is kept only on reality inbounds.
    pub fn push(&mut self, client: Client, short_id: &str) {
        let short_id = self.is_reality().then(|| short_id.to_string());
        self.members.push(Member { client, short_id });
    }

    /// Remove the client with this email (and its paired short id).
    pub fn remove(&mut self, email: &str) -> bool {
        match self.members.iter().position(|m| m.client.email == email) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every client and every short id.
    pub fn clear(&mut self) {
        self.members.clear();
        if let Some(reality) = self.shape.stream_settings.reality_settings.as_mut() {
            reality.short_ids.clear();
        }
    }

    /// Store the reality private key. Returns false when the inbound has no
    /// reality settings to hold it.
    pub fn set_private_key(&mut self, key: &str) -> bool {
        match self.shape.stream_settings.reality_settings.as_mut() {
            Some(reality) => {
                reality.private_key = Some(key.to_string());
                true
            }
            None => false,
        }
    }
}

/// Credentials generated for one user, kept after the user leaves the config.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserRecord {
    pub uuid: String,

    #[serde(rename = "shortId")]
    pub short_id: String,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Username -> credentials.
pub type UserDatabase = BTreeMap<String, UserRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "log": { "loglevel": "warning" },
            "inbounds": [
                {
                    "tag": "reality-in",
                    "port": 443,
                    "protocol": "vless",
                    "settings": {
                        "decryption": "none",
                        "clients": [
                            { "email": "alice", "uuid": "u-a", "flow": "xtls-rprx-vision" },
                            { "email": "bob", "uuid": "u-b", "flow": "xtls-rprx-vision", "level": 0 }
                        ]
                    },
                    "streamSettings": {
                        "network": "tcp",
                        "security": "reality",
                        "realitySettings": {
                            "dest": "www.example.com:443",
                            "serverNames": ["www.example.com", "example.com"],
                            "privateKey": "PRIV",
                            "shortIds": ["aaaaaaaaaaaaaaaa", "bbbbbbbbbbbbbbbb"]
                        }
                    }
                },
                {
                    "port": 1080,
                    "protocol": "socks",
                    "settings": { "auth": "noauth" },
                    "streamSettings": { "network": "tcp" }
                }
            ],
            "outbounds": [ { "protocol": "freedom" } ]
        })
    }

    #[test]
    fn test_members_pair_clients_with_short_ids() {
        let config: XrayConfig = serde_json::from_value(sample()).unwrap();
        let inbound = &config.inbounds[0];
        assert_eq!(inbound.members().len(), 2);
        assert_eq!(
            inbound.member("bob").unwrap().short_id.as_deref(),
            Some("bbbbbbbbbbbbbbbb")
        );
        assert_eq!(inbound.port(), Some(443));
        assert_eq!(inbound.server_name(), Some("www.example.com"));
        assert!(config.inbounds[1].members().is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_unknown_fields() {
        let original = sample();
        let config: XrayConfig = serde_json::from_value(original.clone()).unwrap();
        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_mismatched_short_ids_rejected() {
        let mut doc = sample();
        doc["inbounds"][0]["streamSettings"]["realitySettings"]["shortIds"] =
            json!(["aaaaaaaaaaaaaaaa"]);
        let err = serde_json::from_value::<XrayConfig>(doc).unwrap_err();
        assert!(err.to_string().contains("counts must match"));
    }

    #[test]
    fn test_remove_drops_paired_short_id() {
        let mut config: XrayConfig = serde_json::from_value(sample()).unwrap();
        assert!(config.inbounds[0].remove("alice"));
        assert!(!config.inbounds[0].remove("alice"));

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(
            back["inbounds"][0]["streamSettings"]["realitySettings"]["shortIds"],
            json!(["bbbbbbbbbbbbbbbb"])
        );
        assert_eq!(back["inbounds"][0]["settings"]["clients"][0]["email"], "bob");
    }

    #[test]
    fn test_push_on_reality_inbound_without_settings_creates_them() {
        let doc = json!({
            "inbounds": [{
                "protocol": "vless",
                "port": 8443,
                "settings": { "clients": [] },
                "streamSettings": { "network": "xhttp" }
            }]
        });
        let mut config: XrayConfig = serde_json::from_value(doc).unwrap();
        let client = Client {
            email: "carol".into(),
            uuid: "u-c".into(),
            flow: Some(String::new()),
            other: Map::new(),
        };
        config.inbounds[0].push(client, "cccccccccccccccc");

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(
            back["inbounds"][0]["streamSettings"]["realitySettings"]["shortIds"],
            json!(["cccccccccccccccc"])
        );
    }

    #[test]
    fn test_missing_network_is_structural_error() {
        let doc = json!({
            "inbounds": [{
                "protocol": "vless",
                "settings": { "clients": [] },
                "streamSettings": {}
            }]
        });
        assert!(serde_json::from_value::<XrayConfig>(doc).is_err());
    }

    #[test]
    fn test_string_port_accepted() {
        let mut doc = sample();
        doc["inbounds"][0]["port"] = json!("8443");
        let config: XrayConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(config.inbounds[0].port(), Some(8443));
    }

    #[test]
    fn test_clients_without_uuid_roundtrip_untouched() {
        let mut doc = sample();
        doc["inbounds"].as_array_mut().unwrap().push(json!({
            "port": 8443,
            "protocol": "trojan",
            "settings": { "clients": [ { "email": "t", "password": "p" } ] },
            "streamSettings": { "network": "tcp", "security": "tls" }
        }));

        let config: XrayConfig = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(config.inbounds[2].members()[0].client.email, "t");
        assert_eq!(serde_json::to_value(&config).unwrap(), doc);
    }

    #[test]
    fn test_user_record_keeps_extra_fields() {
        let doc = json!({ "alice": { "uuid": "u-a", "shortId": "aaaaaaaaaaaaaaaa", "note": "x" } });
        let db: UserDatabase = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(db["alice"].short_id, "aaaaaaaaaaaaaaaa");
        assert_eq!(serde_json::to_value(&db).unwrap(), doc);
    }
}
