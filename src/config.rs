use std::fmt;

use serde::{Deserialize, Serialize};

/// Everything the operator chose for the new system.
///
/// Built once by a front end and handed to the installer, which only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timezone: String,
    pub locale: String,
    pub keyboard: String,
    pub hostname: String,
    pub root_password: String,
    /// Created in this order.
    pub users: Vec<User>,
    pub grub: Bootloader,
    pub filesystems: Vec<Filesystem>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub username: String,
    /// Free-text display name stored in the passwd comment field.
    pub gecos: String,
    pub password: String,
    pub groups: Vec<String>,
}

// Keeps passwords out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("gecos", &self.gecos)
            .field("password", &"<redacted>")
            .field("groups", &self.groups)
            .finish()
    }
}

/// Where and how GRUB should be installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bootloader {
    pub graphical: bool,
    pub install_to: Option<String>,
}

/// One `/etc/fstab` line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filesystem {
    pub source: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: String,
    pub dump: u8,
    pub pass: u8,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Your system configuration is as follows:")?;
        writeln!(f, "Hostname: {}", self.hostname)?;
        writeln!(f, "Keyboard: {}", self.keyboard)?;
        writeln!(f, "Timezone: {}", self.timezone)?;
        write!(f, "Locale: {}", self.locale)?;
        if let Some(ref disk) = self.grub.install_to {
            let mode = if self.grub.graphical { "graphical" } else { "text" };
            write!(f, "\nGRUB: {} ({})", disk, mode)?;
        }
        for (i, u) in self.users.iter().enumerate() {
            write!(f, "\nUser {}", 1000 + i)?;
            write!(f, "\n  Username: {}", u.username)?;
            write!(f, "\n  Name: {}", u.gecos)?;
            write!(f, "\n  Groups: {}", u.groups.join(","))?;
        }
        for fs in &self.filesystems {
            write!(f, "\nMount: {} on {} ({})", fs.source, fs.mount_point, fs.fs_type)?;
        }
        Ok(())
    }
}

// ── Meta ──────────────────────────────────────────────────────────────────────

pub const DEFAULT_MIRROR: &str = "https://repo-default.voidlinux.org/current";

/// Installer-side settings the operator is not asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    pub mirror: String,
    pub packages: Vec<String>,
    pub services: Vec<String>,
    /// Link `services` into the default runsvdir after users are created.
    pub enable_services: bool,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            mirror: DEFAULT_MIRROR.to_string(),
            packages: vec!["base-system".to_string()],
            services: vec!["dhcpcd".to_string(), "sshd".to_string()],
            enable_services: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_hides_passwords() {
        let config = Config {
            hostname: "void-test".into(),
            root_password: "toor".into(),
            users: vec![User {
                username: "alice".into(),
                gecos: "Alice".into(),
                password: "hunter2".into(),
                groups: vec!["wheel".into(), "audio".into()],
            }],
            ..Config::default()
        };

        let summary = config.to_string();
        assert!(summary.contains("Hostname: void-test"));
        assert!(summary.contains("User 1000"));
        assert!(summary.contains("Groups: wheel,audio"));
        assert!(!summary.contains("hunter2"));
        assert!(!summary.contains("toor"));
        assert!(!format!("{:?}", config.users[0]).contains("hunter2"));
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            hostname = "box"
            locale = "en_US.UTF-8"

            [[users]]
            username = "void"
            groups = ["wheel"]

            [[filesystems]]
            source = "/dev/sda2"
            mount_point = "/"
            fs_type = "ext4"
            options = "defaults"
            pass = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.hostname, "box");
        assert_eq!(config.users[0].groups, vec!["wheel"]);
        assert_eq!(config.filesystems[0].pass, 1);
        assert_eq!(config.filesystems[0].dump, 0);
        assert!(config.timezone.is_empty());
    }

    #[test]
    fn default_meta_installs_base_system() {
        let meta = Meta::default();
        assert_eq!(meta.packages, vec!["base-system"]);
        assert!(!meta.enable_services);
    }
}
