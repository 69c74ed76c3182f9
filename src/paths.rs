use std::path::PathBuf;

pub struct Paths {
    pub config: PathBuf,
    pub users: PathBuf,
    pub keys: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let root_str = std::env::var("XRAY_USER_ROOT").unwrap_or_else(|_| "/".to_string());
        Self::with_root(PathBuf::from(root_str))
    }

    pub fn with_root(root: PathBuf) -> Self {
        let etc_xray = root.join("usr/local/etc/xray");

        Self {
            config: etc_xray.join("config.json"),
            users: etc_xray.join(".users.json"),
            keys: etc_xray.join(".keys"),
        }
    }

    /// Apply per-file overrides given on the command line.
    pub fn with_overrides(
        mut self,
        config: Option<PathBuf>,
        users: Option<PathBuf>,
        keys: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = config {
            self.config = p;
        }
        if let Some(p) = users {
            self.users = p;
        }
        if let Some(p) = keys {
            self.keys = p;
        }
        self
    }
}
