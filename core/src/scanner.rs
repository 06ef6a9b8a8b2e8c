//! # Scan Coordinator
//!
//! Fans a [`Prober`] out over every host of a [`Subnet`].
//!
//! The dispatcher walks the subnet lazily and only spawns a probe once a
//! semaphore permit is free, so no more than `concurrency` connections are
//! ever open. Finished probes report through a channel to a single collector,
//! which owns the tally and sorts the reachable addresses at the end: the
//! outcome does not depend on the order in which hosts answer.
//!
//! Cancelling the token stops dispatch, aborts in-flight probes and returns
//! whatever had been confirmed so far.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use sshsweep_common::credential::Credential;
use sshsweep_common::error::SweepError;
use sshsweep_common::network::subnet::Subnet;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::probe::{DEFAULT_PROBE_TIMEOUT, ProbeResult, Prober};

pub const DEFAULT_CONCURRENCY: usize = 48;

/// Hard ceiling on parallel probes; each one occupies a blocking thread.
pub const MAX_CONCURRENCY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub concurrency: usize,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_PROBE_TIMEOUT,
            retries: 0,
        }
    }
}

impl ScanOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Upper bound on wall time when every single probe times out.
    pub fn worst_case(&self, host_count: u64) -> Duration {
        let rounds = host_count.div_ceil(self.concurrency.max(1) as u64);
        let attempts = u64::from(self.retries) + 1;
        let total = u32::try_from(rounds.saturating_mul(attempts)).unwrap_or(u32::MAX);
        self.timeout.saturating_mul(total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub probed: u64,
    pub total: u64,
    pub reachable: usize,
}

pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// What a sweep found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Hosts that accepted the credential, in ascending numeric order.
    pub reachable: Vec<Ipv4Addr>,
    pub rejected: usize,
    pub failed: usize,
    pub probed: u64,
    /// Set when the sweep was cancelled before every host was probed.
    pub aborted: bool,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.reachable.is_empty()
    }

    fn record(&mut self, result: ProbeResult) {
        self.probed += 1;
        match result {
            ProbeResult::Reachable(addr) => {
                debug!("Found access with ip address: {addr}");
                self.reachable.push(addr);
            }
            ProbeResult::Rejected(addr) => {
                debug!("{addr}: credential rejected");
                self.rejected += 1;
            }
            ProbeResult::Failed(addr, failure) => {
                debug!("{addr}: failed while {}: {failure}", failure.stage());
                self.failed += 1;
            }
        }
    }
}

pub struct Scanner<P> {
    prober: Arc<P>,
    options: ScanOptions,
    on_progress: Option<ProgressCallback>,
}

impl<P: Prober + 'static> Scanner<P> {
    pub fn new(prober: P, options: ScanOptions) -> Self {
        Self {
            prober: Arc::new(prober),
            options: options.with_concurrency(options.concurrency),
            on_progress: None,
        }
    }

    /// Registers a callback invoked after every finished probe.
    pub fn on_progress(mut self, callback: impl Fn(ScanProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Probes every host of `subnet` with `credential`.
    ///
    /// Per-host failures are counted, never raised. Cancellation yields the
    /// partial outcome with [`ScanOutcome::aborted`] set.
    pub async fn scan(
        &self,
        subnet: &Subnet,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        let total = subnet.host_count();
        info!(
            "Probing {total} hosts in {subnet} ({} at a time, {:.1}s timeout)",
            self.options.concurrency,
            self.options.timeout.as_secs_f64()
        );

        let (tx, rx) = mpsc::channel::<ProbeResult>(self.options.concurrency);
        let credential = Arc::new(credential.clone());

        let (aborted, mut outcome) = tokio::join!(
            self.dispatch(subnet, credential, tx, cancel),
            self.collect(rx, total)
        );

        outcome.reachable.sort_unstable();
        outcome.aborted = aborted;
        outcome
    }

    /// Spawns one task per host under the semaphore; returns `true` when the
    /// sweep was cancelled.
    async fn dispatch(
        &self,
        subnet: &Subnet,
        credential: Arc<Credential>,
        tx: mpsc::Sender<ProbeResult>,
        cancel: &CancellationToken,
    ) -> bool {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut workers: JoinSet<()> = JoinSet::new();
        let mut aborted = false;

        for addr in subnet.hosts() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    aborted = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let prober = Arc::clone(&self.prober);
            let credential = Arc::clone(&credential);
            let tx = tx.clone();
            let options = self.options;

            workers.spawn(async move {
                let result = probe_with_retries(prober.as_ref(), addr, &credential, options).await;
                let _ = tx.send(result).await;
                drop(permit);
            });

            while let Some(joined) = workers.try_join_next() {
                log_join_error(joined);
            }
        }

        // Once every worker is gone the collector sees the channel close.
        drop(tx);

        if aborted {
            workers.abort_all();
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !aborted => {
                    aborted = true;
                    workers.abort_all();
                }
                joined = workers.join_next() => match joined {
                    Some(joined) => log_join_error(joined),
                    None => break,
                },
            }
        }

        if aborted {
            info!("Scan cancelled, in-flight probes abandoned");
        }
        aborted
    }

    async fn collect(&self, mut rx: mpsc::Receiver<ProbeResult>, total: u64) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        while let Some(result) = rx.recv().await {
            outcome.record(result);
            if let Some(callback) = &self.on_progress {
                callback(ScanProgress {
                    probed: outcome.probed,
                    total,
                    reachable: outcome.reachable.len(),
                });
            }
        }
        outcome
    }
}

/// Parses `cidr` and sweeps it.
///
/// This is the entry point for callers holding raw configuration values: the
/// only error is a subnet that cannot be enumerated.
pub async fn perform_scan<P: Prober + 'static>(
    cidr: &str,
    credential: &Credential,
    options: ScanOptions,
    prober: P,
    cancel: &CancellationToken,
) -> Result<ScanOutcome, SweepError> {
    let subnet: Subnet = cidr.parse()?;
    Ok(Scanner::new(prober, options)
        .scan(&subnet, credential, cancel)
        .await)
}

async fn probe_with_retries<P: Prober + ?Sized>(
    prober: &P,
    addr: Ipv4Addr,
    credential: &Credential,
    options: ScanOptions,
) -> ProbeResult {
    let mut attempt: u32 = 0;
    loop {
        let result = prober.probe(addr, credential, options.timeout).await;
        // Only failures are worth another try; a rejection is a verdict.
        if !result.is_failed() || attempt >= options.retries {
            return result;
        }
        attempt += 1;
        debug!("{addr}: attempt {attempt} failed, retrying");
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined
        && !e.is_cancelled()
    {
        error!("Probe task panicked: {e}");
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
