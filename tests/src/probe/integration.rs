use std::time::{Duration, Instant};

use sshsweep_common::credential::Credential;
use sshsweep_core::probe::{ProbeFailure, ProbeResult, Prober, SshProber};

use crate::server::{self, LoginStyle, PASSWORD, USER};
use crate::util::{LOCALHOST, SlowRelay, closed_port, silent_listener};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);

fn wrong_password() -> Credential {
    Credential::new(USER, "definitely-not-the-password")
}

fn right_password() -> Credential {
    Credential::new(USER, PASSWORD)
}

async fn login(port: u16, credential: &Credential) -> ProbeResult {
    SshProber::default()
        .with_port(port)
        .probe(LOCALHOST, credential, LOGIN_TIMEOUT)
        .await
}

#[tokio::test]
async fn refused_port_fails_without_waiting() -> anyhow::Result<()> {
    let prober = SshProber::default().with_port(closed_port()?);
    let timeout = Duration::from_secs(2);

    let start = Instant::now();
    let result = prober.probe(LOCALHOST, &wrong_password(), timeout).await;

    assert_eq!(result, ProbeResult::Failed(LOCALHOST, ProbeFailure::Refused));
    assert!(start.elapsed() < timeout);
    Ok(())
}

/// A peer that accepts TCP but never sends a banner must not hold the probe
/// much past its timeout.
#[tokio::test]
async fn silent_peer_is_bounded_by_timeout() -> anyhow::Result<()> {
    let (_listener, port) = silent_listener()?;
    let prober = SshProber::default().with_port(port);
    let timeout = Duration::from_millis(500);

    let start = Instant::now();
    let result = prober.probe(LOCALHOST, &wrong_password(), timeout).await;
    let elapsed = start.elapsed();

    assert!(result.is_failed(), "unexpected result: {result:?}");
    assert!(
        elapsed < timeout + Duration::from_secs(1),
        "attempt took {elapsed:?}"
    );
    Ok(())
}

#[tokio::test]
async fn correct_password_is_reachable() -> anyhow::Result<()> {
    let port = server::spawn(LoginStyle::Password).await?;
    assert_eq!(
        login(port, &right_password()).await,
        ProbeResult::Reachable(LOCALHOST)
    );
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected_not_failed() -> anyhow::Result<()> {
    let port = server::spawn(LoginStyle::Password).await?;
    assert_eq!(
        login(port, &wrong_password()).await,
        ProbeResult::Rejected(LOCALHOST)
    );
    assert_eq!(
        login(port, &Credential::new("intruder", PASSWORD)).await,
        ProbeResult::Rejected(LOCALHOST)
    );
    Ok(())
}

#[tokio::test]
async fn keyboard_interactive_only_server_takes_the_password() -> anyhow::Result<()> {
    let port = server::spawn(LoginStyle::KeyboardInteractive).await?;
    assert_eq!(
        login(port, &right_password()).await,
        ProbeResult::Reachable(LOCALHOST)
    );
    assert_eq!(
        login(port, &wrong_password()).await,
        ProbeResult::Rejected(LOCALHOST)
    );
    Ok(())
}

/// The handshake eats most of the budget and the server then never answers
/// the password. The attempt has to give up and close its socket within the
/// one timeout, before the caller moves on to the next host.
#[tokio::test]
async fn slow_handshake_leaves_no_socket_behind() -> anyhow::Result<()> {
    let port = server::spawn(LoginStyle::Stall).await?;
    let relay = SlowRelay::start(port, Duration::from_millis(600)).await?;
    let timeout = Duration::from_secs(1);

    let result = SshProber::default()
        .with_port(relay.port)
        .probe(LOCALHOST, &right_password(), timeout)
        .await;
    assert!(result.is_failed(), "unexpected result: {result:?}");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(relay.open_connections(), 0);
    Ok(())
}
