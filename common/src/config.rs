//! # Configuration
//!
//! `sshsweep` reads its network, credentials and tuning knobs from a YAML
//! file (by default `config.yaml` in the working directory):
//!
//! ```yaml
//! network_ip: 192.168.1.0
//! username: admin
//! password: secret
//! log_level: INFO
//! ```
//!
//! Everything except the first three keys is optional.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::credential::Credential;
use crate::error::{ConfigError, SubnetError};
use crate::log::LogLevel;
use crate::network::subnet::Subnet;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// How a probe treats the host key presented during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Trust whatever key the host presents.
    ///
    /// Discovery sweeps run unattended against devices that have never been
    /// seen before, so there is nobody to confirm a fingerprint.
    #[default]
    AcceptAny,
    /// Only authenticate against hosts whose key matches an entry in this
    /// OpenSSH `known_hosts` file.
    KnownHosts(PathBuf),
}

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base address of the network to sweep, either bare (`192.168.1.0`,
    /// read as a `/24`) or in CIDR notation.
    #[serde(deserialize_with = "scalar_string")]
    pub network_ip: String,
    #[serde(deserialize_with = "scalar_string")]
    pub username: String,
    #[serde(deserialize_with = "scalar_string")]
    pub password: String,
    /// One of INFO, DEBUG, WARN, WARNING or ERROR.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Maximum number of hosts probed at the same time.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Per-host budget for connecting and authenticating, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    /// Extra attempts for hosts whose probe failed.
    #[serde(default)]
    pub retries: Option<u32>,
    /// Verify host keys against this file instead of trusting any key.
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
}

impl Config {
    /// Loads and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::from_yaml(&text, path)
    }

    /// Parses configuration text; `origin` is only used for error messages.
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_ip.trim().is_empty() {
            return Err(ConfigError::Invalid("network_ip must not be empty".into()));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid("username must not be empty".into()));
        }
        if let Some(secs) = self.timeout_secs {
            let valid = secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok();
            if !valid {
                return Err(ConfigError::Invalid(format!(
                    "timeout_secs must be a positive number of seconds, got {secs}"
                )));
            }
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        Ok(())
    }

    pub fn subnet(&self) -> Result<Subnet, SubnetError> {
        Subnet::from_config(&self.network_ip)
    }

    pub fn credential(&self) -> Credential {
        Credential::new(self.username.clone(), self.password.clone())
    }

    pub fn log_level(&self) -> (LogLevel, Option<String>) {
        LogLevel::resolve(self.log_level.as_deref())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    pub fn host_key_policy(&self) -> HostKeyPolicy {
        match &self.known_hosts {
            Some(path) => HostKeyPolicy::KnownHosts(expand_home(path)),
            None => HostKeyPolicy::AcceptAny,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("network_ip", &self.network_ip)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("concurrency", &self.concurrency)
            .field("timeout_secs", &self.timeout_secs)
            .field("retries", &self.retries)
            .field("known_hosts", &self.known_hosts)
            .finish()
    }
}

/// Accepts any YAML scalar as a string, so `password: 1234` works unquoted.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string, found {other:?}"
        ))),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::from_yaml(text, Path::new("test.yaml"))
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = parse("network_ip: 192.168.1.0\nusername: pi\npassword: raspberry\n").unwrap();

        assert_eq!(cfg.subnet().unwrap().to_string(), "192.168.1.0/24");
        assert_eq!(cfg.credential().username(), "pi");
        assert_eq!(cfg.log_level(), (LogLevel::Info, None));
        assert_eq!(cfg.timeout(), None);
        assert_eq!(cfg.host_key_policy(), HostKeyPolicy::AcceptAny);
    }

    #[test]
    fn full_config_is_parsed() {
        let cfg = parse(
            r#"
network_ip: 10.0.0.0/28
username: admin
password: 1234
log_level: debug
concurrency: 16
timeout_secs: 0.5
retries: 2
known_hosts: /etc/ssh/ssh_known_hosts
"#,
        )
        .unwrap();

        assert_eq!(cfg.subnet().unwrap().host_count(), 14);
        assert_eq!(cfg.credential().secret(), "1234");
        assert_eq!(cfg.log_level().0, LogLevel::Debug);
        assert_eq!(cfg.concurrency, Some(16));
        assert_eq!(cfg.timeout(), Some(Duration::from_millis(500)));
        assert_eq!(cfg.retries, Some(2));
        assert_eq!(
            cfg.host_key_policy(),
            HostKeyPolicy::KnownHosts(PathBuf::from("/etc/ssh/ssh_known_hosts"))
        );
    }

    #[test]
    fn unknown_log_level_is_reported_not_fatal() {
        let cfg = parse("network_ip: 10.0.0.0\nusername: a\npassword: b\nlog_level: chatty\n")
            .unwrap();
        assert_eq!(cfg.log_level(), (LogLevel::Info, Some("chatty".to_string())));
    }

    #[test]
    fn missing_keys_fail_to_parse() {
        assert!(matches!(
            parse("network_ip: 10.0.0.0\nusername: a\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            parse("network_ip: 10.0.0.0\nusername: ''\npassword: b\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse("network_ip: 10.0.0.0\nusername: a\npassword: b\ntimeout_secs: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse("network_ip: 10.0.0.0\nusername: a\npassword: b\nconcurrency: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn oversized_timeout_is_invalid() {
        for secs in ["1e30", ".inf", ".nan", "-3"] {
            let text = format!("network_ip: 10.0.0.0\nusername: a\npassword: b\ntimeout_secs: {secs}\n");
            assert!(
                matches!(parse(&text), Err(ConfigError::Invalid(_))),
                "timeout_secs {secs} was accepted"
            );
        }
    }

    #[test]
    fn timeout_never_panics_on_unvalidated_values() {
        let mut cfg = parse("network_ip: 10.0.0.0\nusername: a\npassword: b\n").unwrap();
        cfg.timeout_secs = Some(1e30);
        assert_eq!(cfg.timeout(), None);
    }

    #[test]
    fn debug_output_hides_password() {
        let cfg = parse("network_ip: 10.0.0.0\nusername: a\npassword: topsecret\n").unwrap();
        assert!(!format!("{cfg:?}").contains("topsecret"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert!(matches!(Config::load(&path), Err(ConfigError::NotFound(p)) if p == path));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network_ip: 172.16.5.0/30").unwrap();
        writeln!(file, "username: ops").unwrap();
        writeln!(file, "password: pw").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.subnet().unwrap().host_count(), 2);
    }
}
