//! # Error Taxonomy
//!
//! Only two things can stop `sshsweep` from producing a report: a broken
//! configuration and a subnet that does not describe an IPv4 network.
//! Per-host connectivity problems are *results*, not errors, and live with
//! the probe in `sshsweep-core`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The configuration file could not be turned into a usable [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A CIDR string that cannot be enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubnetError {
    #[error("invalid subnet '{0}': expected <ipv4>/<prefix>")]
    Malformed(String),

    #[error("invalid subnet '{input}': '{address}' is not an IPv4 address")]
    Address { input: String, address: String },

    #[error("invalid subnet '{input}': prefix '{prefix}' is not in 0..=32")]
    Prefix { input: String, prefix: String },
}

/// Errors that abort a sweep before any host has been probed.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidSubnet(#[from] SubnetError),
}
