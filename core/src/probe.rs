//! The **abstraction** for a single reachability probe.
//!
//! A probe walks one address through `Connecting -> Authenticating` and ends
//! in exactly one terminal state:
//!
//! * [`ProbeResult::Reachable`]: the credential opened a session.
//! * [`ProbeResult::Rejected`]: the host speaks SSH but refused the credential.
//! * [`ProbeResult::Failed`]: anything else, tagged with the stage it died in.
//!
//! Probes never return errors; every failure path is folded into the result
//! so one bad host cannot take down a sweep.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use sshsweep_common::credential::Credential;
use thiserror::Error;

mod ssh;

pub use ssh::SshProber;

/// Default per-host budget for connecting and authenticating.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub const SSH_PORT: u16 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStage {
    Connecting,
    Authenticating,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStage::Connecting => f.write_str("connecting"),
            ProbeStage::Authenticating => f.write_str("authenticating"),
        }
    }
}

/// Why a probe could not reach a verdict about the credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("connection refused")]
    Refused,

    #[error("timed out while {0}")]
    TimedOut(ProbeStage),

    #[error("network unreachable")]
    Unreachable,

    #[error("host key rejected: {0}")]
    HostKey(String),

    #[error("ssh protocol error: {0}")]
    Protocol(String),

    #[error("i/o error while {stage}: {message}")]
    Io { stage: ProbeStage, message: String },

    #[error("probe task aborted")]
    Aborted,
}

impl ProbeFailure {
    pub fn stage(&self) -> ProbeStage {
        match self {
            ProbeFailure::Refused | ProbeFailure::Unreachable | ProbeFailure::Aborted => {
                ProbeStage::Connecting
            }
            ProbeFailure::TimedOut(stage) | ProbeFailure::Io { stage, .. } => *stage,
            ProbeFailure::HostKey(_) | ProbeFailure::Protocol(_) => ProbeStage::Authenticating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Reachable(Ipv4Addr),
    Rejected(Ipv4Addr),
    Failed(Ipv4Addr, ProbeFailure),
}

impl ProbeResult {
    pub fn addr(&self) -> Ipv4Addr {
        match self {
            ProbeResult::Reachable(addr)
            | ProbeResult::Rejected(addr)
            | ProbeResult::Failed(addr, _) => *addr,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeResult::Reachable(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProbeResult::Failed(..))
    }
}

/// Attempts an authenticated login against one address.
///
/// Implementations must finish within roughly `timeout` and must release any
/// connection they opened before returning.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, addr: Ipv4Addr, credential: &Credential, timeout: Duration)
    -> ProbeResult;
}
