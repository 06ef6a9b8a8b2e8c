//! Password login over SSH using `libssh2` (through the `ssh2` crate).
//!
//! `ssh2` sessions are blocking, so every attempt runs on tokio's blocking
//! pool. The socket, the libssh2 session and an outer async deadline all
//! carry the probe timeout, which keeps a silent host from pinning a worker.

use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ssh2::{CheckResult, ErrorCode, KeyboardInteractivePrompt, KnownHostFileKind, Prompt, Session};
use sshsweep_common::config::HostKeyPolicy;
use sshsweep_common::credential::Credential;
use tracing::{debug, trace};

use super::{ProbeFailure, ProbeResult, ProbeStage, Prober, SSH_PORT};

// libssh2 session error codes (libssh2.h)
const LIBSSH2_ERROR_SOCKET_SEND: i32 = -7;
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_SOCKET_DISCONNECT: i32 = -13;
const LIBSSH2_ERROR_PASSWORD_EXPIRED: i32 = -15;
const LIBSSH2_ERROR_METHOD_NONE: i32 = -17;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;
const LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED: i32 = -19;
const LIBSSH2_ERROR_SOCKET_RECV: i32 = -43;

const KEYBOARD_INTERACTIVE: &str = "keyboard-interactive";

/// Smallest slice worth starting a stage with. Zero would mean "wait
/// forever" to both the socket and libssh2.
const MIN_STAGE_BUDGET: Duration = Duration::from_millis(50);

/// Slack on top of the probe timeout before the async side gives up on the
/// blocking attempt. Must exceed [`MIN_STAGE_BUDGET`], the most a disconnect
/// can add past the deadline.
const DEADLINE_GRACE: Duration = Duration::from_millis(250);

/// Production [`Prober`]: connects to port 22 and tries the credential.
#[derive(Debug, Clone)]
pub struct SshProber {
    port: u16,
    host_keys: HostKeyPolicy,
}

impl SshProber {
    pub fn new(host_keys: HostKeyPolicy) -> Self {
        Self {
            port: SSH_PORT,
            host_keys,
        }
    }

    /// Targets a non-standard port. Mostly useful against local test servers.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Default for SshProber {
    fn default() -> Self {
        Self::new(HostKeyPolicy::AcceptAny)
    }
}

#[async_trait]
impl Prober for SshProber {
    async fn probe(
        &self,
        addr: Ipv4Addr,
        credential: &Credential,
        timeout: Duration,
    ) -> ProbeResult {
        let port = self.port;
        let host_keys = self.host_keys.clone();
        let credential = credential.clone();

        let attempt = tokio::task::spawn_blocking(move || {
            attempt_login(addr, port, &credential, &host_keys, timeout)
        });

        match tokio::time::timeout(timeout.saturating_add(DEADLINE_GRACE), attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                debug!("probe task for {addr} did not complete: {join_err}");
                ProbeResult::Failed(addr, ProbeFailure::Aborted)
            }
            // Only reachable if libssh2 ignores its timeout; the blocking
            // attempt then drops the connection on its own.
            Err(_elapsed) => ProbeResult::Failed(
                addr,
                ProbeFailure::TimedOut(ProbeStage::Authenticating),
            ),
        }
    }
}

fn attempt_login(
    addr: Ipv4Addr,
    port: u16,
    credential: &Credential,
    host_keys: &HostKeyPolicy,
    timeout: Duration,
) -> ProbeResult {
    let deadline = Deadline::start(timeout);
    let socket_addr = SocketAddr::from((addr, port));

    trace!("{addr}: connecting");
    let stream = match TcpStream::connect_timeout(&socket_addr, timeout) {
        Ok(stream) => stream,
        Err(e) => return ProbeResult::Failed(addr, classify_connect_error(&e)),
    };
    let Some(budget) = deadline.remaining() else {
        return ProbeResult::Failed(addr, ProbeFailure::TimedOut(ProbeStage::Connecting));
    };

    // libssh2 takes ownership of the stream; the clone lets every later
    // stage re-arm the socket timeouts.
    let socket = match stream.try_clone() {
        Ok(socket) => socket,
        Err(e) => return ProbeResult::Failed(addr, io_failure(ProbeStage::Connecting, &e)),
    };

    trace!("{addr}: authenticating");
    let mut session = match Session::new() {
        Ok(session) => session,
        Err(e) => return ProbeResult::Failed(addr, ProbeFailure::Protocol(e.to_string())),
    };
    if let Err(e) = arm(&session, &socket, budget) {
        return ProbeResult::Failed(addr, io_failure(ProbeStage::Connecting, &e));
    }
    session.set_tcp_stream(stream);

    if let Err(e) = session.handshake() {
        return ProbeResult::Failed(addr, classify_session_error(&e, ProbeStage::Authenticating));
    }

    if let HostKeyPolicy::KnownHosts(path) = host_keys
        && let Err(reason) = verify_host_key(&session, &addr.to_string(), port, path)
    {
        close(&session, &socket, &deadline);
        return ProbeResult::Failed(addr, ProbeFailure::HostKey(reason));
    }

    let result = authenticate(&session, &socket, &deadline, addr, credential);
    close(&session, &socket, &deadline);
    result
}

/// Tries the password, then the same secret over keyboard-interactive when
/// the server turned the password down but offers that method.
fn authenticate(
    session: &Session,
    socket: &TcpStream,
    deadline: &Deadline,
    addr: Ipv4Addr,
    credential: &Credential,
) -> ProbeResult {
    let user = credential.username();

    if let Err(failure) = rearm(session, socket, deadline) {
        return ProbeResult::Failed(addr, failure);
    }
    match session.userauth_password(user, credential.secret()) {
        Ok(()) if session.authenticated() => return ProbeResult::Reachable(addr),
        Ok(()) => {}
        Err(e) => {
            if let Some(failure) = classify_auth_error(&e) {
                return ProbeResult::Failed(addr, failure);
            }
        }
    }

    // From here on the password verdict stands if anything goes wrong.
    if rearm(session, socket, deadline).is_err() {
        return ProbeResult::Rejected(addr);
    }
    let offers_keyboard = match session.auth_methods(user) {
        Ok(methods) => methods.split(',').any(|m| m.trim() == KEYBOARD_INTERACTIVE),
        Err(_) => false,
    };
    if !offers_keyboard || rearm(session, socket, deadline).is_err() {
        return ProbeResult::Rejected(addr);
    }

    trace!("{addr}: retrying over {KEYBOARD_INTERACTIVE}");
    let mut answer = SecretPrompt(credential.secret());
    match session.userauth_keyboard_interactive(user, &mut answer) {
        Ok(()) if session.authenticated() => ProbeResult::Reachable(addr),
        Ok(()) => ProbeResult::Rejected(addr),
        Err(e) => match classify_auth_error(&e) {
            Some(failure) => ProbeResult::Failed(addr, failure),
            None => ProbeResult::Rejected(addr),
        },
    }
}

/// Answers every keyboard-interactive prompt with the password.
struct SecretPrompt<'a>(&'a str);

impl KeyboardInteractivePrompt for SecretPrompt<'_> {
    fn prompt<'p>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[Prompt<'p>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.0.to_string()).collect()
    }
}

fn close(session: &Session, socket: &TcpStream, deadline: &Deadline) {
    let budget = deadline.remaining().unwrap_or(MIN_STAGE_BUDGET);
    let _ = arm(session, socket, budget);
    if let Err(e) = session.disconnect(None, "sshsweep probe complete", None) {
        trace!("disconnect failed: {e}");
    }
}

fn verify_host_key(session: &Session, host: &str, port: u16, path: &Path) -> Result<(), String> {
    let mut known_hosts = session.known_hosts().map_err(|e| e.to_string())?;
    known_hosts
        .read_file(path, KnownHostFileKind::OpenSSH)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;

    let (key, _key_type) = session
        .host_key()
        .ok_or_else(|| "host presented no key".to_string())?;

    match known_hosts.check_port(host, port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => Err(format!("{host} is not in {}", path.display())),
        CheckResult::Mismatch => Err(format!("key for {host} does not match {}", path.display())),
        CheckResult::Failure => Err("known_hosts lookup failed".to_string()),
    }
}

/// Wall-clock budget shared by every stage of one attempt. Each blocking
/// libssh2 call gets what is left, never a fresh full timeout.
struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    /// `None` once less than [`MIN_STAGE_BUDGET`] is left.
    fn remaining(&self) -> Option<Duration> {
        self.timeout
            .checked_sub(self.started.elapsed())
            .filter(|left| *left >= MIN_STAGE_BUDGET)
    }
}

fn arm(session: &Session, socket: &TcpStream, budget: Duration) -> io::Result<()> {
    socket.set_read_timeout(Some(budget))?;
    socket.set_write_timeout(Some(budget))?;
    session.set_timeout(as_session_millis(budget));
    Ok(())
}

fn rearm(session: &Session, socket: &TcpStream, deadline: &Deadline) -> Result<(), ProbeFailure> {
    let budget = deadline
        .remaining()
        .ok_or(ProbeFailure::TimedOut(ProbeStage::Authenticating))?;
    arm(session, socket, budget).map_err(|e| io_failure(ProbeStage::Authenticating, &e))
}

fn as_session_millis(budget: Duration) -> u32 {
    u32::try_from(budget.as_millis()).unwrap_or(u32::MAX).max(1)
}

fn classify_connect_error(e: &io::Error) -> ProbeFailure {
    match e.kind() {
        ErrorKind::ConnectionRefused => ProbeFailure::Refused,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => {
            ProbeFailure::TimedOut(ProbeStage::Connecting)
        }
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => ProbeFailure::Unreachable,
        _ => io_failure(ProbeStage::Connecting, e),
    }
}

fn io_failure(stage: ProbeStage, e: &io::Error) -> ProbeFailure {
    ProbeFailure::Io {
        stage,
        message: e.to_string(),
    }
}

fn classify_session_error(e: &ssh2::Error, stage: ProbeStage) -> ProbeFailure {
    match e.code() {
        ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) => ProbeFailure::TimedOut(stage),
        ErrorCode::Session(
            LIBSSH2_ERROR_SOCKET_SEND | LIBSSH2_ERROR_SOCKET_RECV | LIBSSH2_ERROR_SOCKET_DISCONNECT,
        ) => ProbeFailure::Io {
            stage,
            message: e.message().to_string(),
        },
        _ => ProbeFailure::Protocol(e.message().to_string()),
    }
}

/// `None` means the server answered and turned the credential down.
fn classify_auth_error(e: &ssh2::Error) -> Option<ProbeFailure> {
    match e.code() {
        ErrorCode::Session(
            LIBSSH2_ERROR_AUTHENTICATION_FAILED
            | LIBSSH2_ERROR_PUBLICKEY_UNVERIFIED
            | LIBSSH2_ERROR_PASSWORD_EXPIRED
            | LIBSSH2_ERROR_METHOD_NONE,
        ) => None,
        _ => Some(classify_session_error(e, ProbeStage::Authenticating)),
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
