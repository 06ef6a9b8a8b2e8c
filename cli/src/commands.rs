pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use sshsweep_common::config::{Config, DEFAULT_CONFIG_PATH, HostKeyPolicy};
use sshsweep_common::credential::Credential;
use sshsweep_common::error::SweepError;
use sshsweep_common::network::subnet::Subnet;
use sshsweep_core::scanner::ScanOptions;

#[derive(Parser, Debug)]
#[command(name = "sshsweep")]
#[command(version, about = "Find the hosts of a subnet that accept an SSH login.")]
pub struct CommandLine {
    /// YAML file holding network_ip, username and password
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Sweep this network instead of the configured one (CIDR or bare address)
    #[arg(short, long)]
    pub subnet: Option<String>,

    /// Maximum number of hosts probed at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Per-host connect and login budget in seconds
    #[arg(short, long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Extra attempts for hosts whose probe failed
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Reduce output (-q hides the banner, -qq prints bare addresses)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Do not listen for 'q' on the keyboard
    #[arg(long)]
    pub no_input: bool,
}

/// Everything a sweep needs, after merging flags over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub subnet: Subnet,
    pub credential: Credential,
    pub options: ScanOptions,
    pub host_keys: HostKeyPolicy,
    pub quiet: u8,
    pub disable_input: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn settings(&self, cfg: &Config) -> Result<Settings, SweepError> {
        let subnet = match &self.subnet {
            Some(value) => Subnet::from_config(value)?,
            None => cfg.subnet()?,
        };

        let mut options = ScanOptions::default();
        if let Some(concurrency) = self.concurrency.or(cfg.concurrency) {
            options = options.with_concurrency(concurrency);
        }
        if let Some(timeout) = self.timeout.or(cfg.timeout()) {
            options = options.with_timeout(timeout);
        }
        if let Some(retries) = self.retries.or(cfg.retries) {
            options = options.with_retries(retries);
        }

        Ok(Settings {
            subnet,
            credential: cfg.credential(),
            options,
            host_keys: cfg.host_key_policy(),
            quiet: self.quiet,
            disable_input: self.no_input,
        })
    }
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if secs <= 0.0 {
        return Err(format!("timeout must be positive, got {value}"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("'{value}': {e}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
