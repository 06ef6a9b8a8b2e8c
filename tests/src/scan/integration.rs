use std::io::Write;
use std::time::Duration;

use sshsweep_common::config::Config;
use sshsweep_common::credential::Credential;
use sshsweep_core::probe::SshProber;
use sshsweep_core::scanner::{ScanOptions, Scanner, perform_scan};
use tokio_util::sync::CancellationToken;

use crate::server::{self, LoginStyle, PASSWORD, USER};
use crate::util::{LOCALHOST, closed_port};

#[tokio::test]
async fn loopback_block_without_ssh_finds_nothing() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        "network_ip: 127.0.0.0/30\nusername: root\npassword: toor\ntimeout_secs: 1\nconcurrency: 4"
    )?;
    let cfg = Config::load(file.path())?;

    let subnet = cfg.subnet()?;
    assert_eq!(subnet.host_count(), 2);

    let options = ScanOptions::default()
        .with_concurrency(cfg.concurrency.unwrap_or(1))
        .with_timeout(cfg.timeout().unwrap_or(Duration::from_secs(1)));
    let prober = SshProber::new(cfg.host_key_policy()).with_port(closed_port()?);

    let outcome = Scanner::new(prober, options)
        .scan(&subnet, &cfg.credential(), &CancellationToken::new())
        .await;

    assert!(outcome.is_empty());
    assert!(!outcome.aborted);
    assert_eq!(outcome.probed, 2);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.rejected, 0);
    Ok(())
}

#[tokio::test]
async fn sweep_reports_host_that_accepts_the_login() -> anyhow::Result<()> {
    let port = server::spawn(LoginStyle::Password).await?;
    let options = ScanOptions::default().with_timeout(Duration::from_secs(5));

    let outcome = perform_scan(
        "127.0.0.1/32",
        &Credential::new(USER, PASSWORD),
        options,
        SshProber::default().with_port(port),
        &CancellationToken::new(),
    )
    .await?;

    assert_eq!(outcome.reachable, [LOCALHOST]);
    assert_eq!(outcome.probed, 1);
    assert!(!outcome.aborted);
    Ok(())
}

#[tokio::test]
async fn cancelled_before_start_probes_nothing() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let prober = SshProber::default().with_port(closed_port()?);
    let credential = Credential::new("root", "toor");
    let outcome = perform_scan(
        "127.0.0.0/29",
        &credential,
        ScanOptions::default(),
        prober,
        &cancel,
    )
    .await?;

    assert!(outcome.aborted);
    assert_eq!(outcome.probed, 0);
    assert!(outcome.is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_cidr_is_rejected_up_front() {
    let credential = Credential::new("root", "toor");
    let result = perform_scan(
        "127.0.0.0/33",
        &credential,
        ScanOptions::default(),
        SshProber::default(),
        &CancellationToken::new(),
    )
    .await;
    assert!(result.is_err());
}
