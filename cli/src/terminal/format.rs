use std::net::Ipv4Addr;
use std::time::Duration;

use colored::*;
use sshsweep_common::config::HostKeyPolicy;
use sshsweep_core::probe::SSH_PORT;
use sshsweep_core::scanner::ScanOutcome;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn outcome_to_details(outcome: &ScanOutcome) -> Vec<Detail> {
    vec![
        (
            "Access".to_string(),
            outcome.reachable.len().to_string().green().bold(),
        ),
        ("Denied".to_string(), outcome.rejected.to_string().normal()),
        ("Failed".to_string(), outcome.failed.to_string().normal()),
        (
            "Probed".to_string(),
            outcome.probed.to_string().color(colors::TEXT_DEFAULT),
        ),
    ]
}

/// Rows shown under a reachable host: how to log in and where.
pub fn device_details(addr: Ipv4Addr, username: &str) -> Vec<Detail> {
    vec![
        (
            "Login".to_string(),
            format!("ssh {username}@{addr}").color(colors::TEXT_DEFAULT),
        ),
        ("Port".to_string(), SSH_PORT.to_string().normal()),
    ]
}

pub fn host_key_policy(policy: &HostKeyPolicy) -> String {
    match policy {
        HostKeyPolicy::AcceptAny => "accept any".to_string(),
        HostKeyPolicy::KnownHosts(path) => format!("verify ({})", path.display()),
    }
}

/// Renders durations the way a person reads them: `850ms`, `12.4s`, `4m 10s`.
pub fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs >= 1 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
