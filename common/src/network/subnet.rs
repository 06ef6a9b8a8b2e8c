//! # Subnet Model
//!
//! An IPv4 network in CIDR notation (e.g. `192.168.1.0/24`) and the
//! enumeration of the host addresses inside it.
//!
//! Networks holding more than two addresses lose their network and broadcast
//! address to enumeration. Point-to-point (`/31`) and single-host (`/32`)
//! networks keep every address.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;

use crate::error::SubnetError;
use crate::network::range::{HostIter, Ipv4Range};

/// Prefix assumed when the configuration only names a base address.
pub const DEFAULT_PREFIX: u8 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    network: Ipv4Network,
}

impl Subnet {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, SubnetError> {
        let network = Ipv4Network::new(addr, prefix).map_err(|_| SubnetError::Prefix {
            input: format!("{addr}/{prefix}"),
            prefix: prefix.to_string(),
        })?;
        Ok(Self { network })
    }

    /// Parses the `network_ip` configuration value.
    ///
    /// A bare address such as `10.0.0.0` is read as a `/24`.
    pub fn from_config(value: &str) -> Result<Self, SubnetError> {
        let value = value.trim();
        if value.contains('/') {
            value.parse()
        } else {
            format!("{value}/{DEFAULT_PREFIX}").parse()
        }
    }

    pub fn network_addr(&self) -> Ipv4Addr {
        self.network.network()
    }

    pub fn broadcast_addr(&self) -> Ipv4Addr {
        self.network.broadcast()
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    /// The addresses a probe should be sent to.
    pub fn host_range(&self) -> Ipv4Range {
        let start: u32 = self.network_addr().into();
        let end: u32 = self.broadcast_addr().into();

        if self.prefix() >= 31 {
            return Ipv4Range::new(start.into(), end.into());
        }

        // Strip network and broadcast
        Ipv4Range::new((start + 1).into(), (end - 1).into())
    }

    /// A fresh, ascending iterator over the usable host addresses.
    pub fn hosts(&self) -> HostIter {
        self.host_range().iter()
    }

    pub fn host_count(&self) -> u64 {
        self.host_range().len()
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_addr(), self.prefix())
    }
}

impl FromStr for Subnet {
    type Err = SubnetError;

    /// Parses CIDR notation like "192.168.1.0/24".
    ///
    /// Host bits in the address are allowed and ignored, so "192.168.1.77/24"
    /// describes the same network.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((ip_str, prefix_str)) = s.split_once('/') else {
            return Err(SubnetError::Malformed(s.to_string()));
        };

        let addr = ip_str
            .trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| SubnetError::Address {
                input: s.to_string(),
                address: ip_str.to_string(),
            })?;

        let prefix_err = || SubnetError::Prefix {
            input: s.to_string(),
            prefix: prefix_str.to_string(),
        };

        let prefix = prefix_str.trim().parse::<u8>().map_err(|_| prefix_err())?;
        if prefix > 32 {
            return Err(prefix_err());
        }

        Subnet::new(addr, prefix)
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
