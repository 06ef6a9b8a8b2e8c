use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use colored::*;
use sshsweep_common::success;
use sshsweep_core::probe::SshProber;
use sshsweep_core::scanner::{ScanOutcome, Scanner};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::Settings;
use crate::mprint;
use crate::terminal::input::InputHandle;
use crate::terminal::{colors, format, print, spinner};

pub async fn scan(settings: &Settings, cancel: CancellationToken) -> anyhow::Result<ScanOutcome> {
    let worst_case = settings.options.worst_case(settings.subnet.host_count());
    debug!(
        "This process can take up to {}",
        format::human_duration(worst_case)
    );

    let input = if settings.disable_input {
        None
    } else {
        InputHandle::start(cancel.clone())
    };

    let prober = SshProber::new(settings.host_keys.clone());
    let scanner = Scanner::new(prober, settings.options).on_progress(spinner::report_scan_progress);

    let start_time = Instant::now();
    let outcome = scanner
        .scan(&settings.subnet, &settings.credential, &cancel)
        .await;

    drop(input);
    spinner::stop();

    let mut report = TerminalReport::new(settings.quiet, settings.credential.username());
    scan_ends(&mut report, &outcome, start_time.elapsed());
    Ok(outcome)
}

/// Where the result of a sweep ends up.
pub trait Report {
    fn header(&mut self, found: usize);
    fn device(&mut self, idx: usize, addr: Ipv4Addr);
    fn no_devices(&mut self);
    /// Called before anything else when the sweep was cut short.
    fn partial(&mut self, outcome: &ScanOutcome);
    fn summary(&mut self, outcome: &ScanOutcome, elapsed: Duration);
}

pub fn scan_ends<R: Report + ?Sized>(report: &mut R, outcome: &ScanOutcome, elapsed: Duration) {
    if outcome.aborted {
        report.partial(outcome);
    }

    if outcome.is_empty() {
        report.no_devices();
        return;
    }

    report.header(outcome.reachable.len());
    for (idx, addr) in outcome.reachable.iter().enumerate() {
        report.device(idx, *addr);
    }
    report.summary(outcome, elapsed);
}

pub struct TerminalReport {
    quiet: u8,
    username: String,
}

impl TerminalReport {
    pub fn new(quiet: u8, username: &str) -> Self {
        Self {
            quiet,
            username: username.to_string(),
        }
    }
}

impl Report for TerminalReport {
    fn header(&mut self, found: usize) {
        match self.quiet {
            0 => print::header(&format!("{found} devices with ssh access"), self.quiet),
            1 => info!("Devices with SSH access:"),
            _ => {}
        }
    }

    fn device(&mut self, idx: usize, addr: Ipv4Addr) {
        match self.quiet {
            0 => print::device(idx, addr, &format::device_details(addr, &self.username)),
            _ => mprint!(&addr.to_string()),
        }
    }

    fn no_devices(&mut self) {
        error!("Empty list");
        if self.quiet == 0 {
            print::header("zero devices found", self.quiet);
            print::no_results();
        }
    }

    fn partial(&mut self, outcome: &ScanOutcome) {
        warn!(
            "Sweep stopped early after {} hosts, results are partial",
            outcome.probed
        );
    }

    fn summary(&mut self, outcome: &ScanOutcome, elapsed: Duration) {
        let found: ColoredString = format!("{} devices", outcome.reachable.len())
            .bold()
            .green();
        let total_time: ColoredString = format::human_duration(elapsed).bold().yellow();
        let output: ColoredString =
            format!("Sweep Complete: {found} accept the login, took {total_time}")
                .color(colors::TEXT_DEFAULT);

        match self.quiet {
            0 => {
                mprint!();
                print::detail_rows(&format::outcome_to_details(outcome), 0);
                print::fat_separator();
                print::centered(&output.to_string());
            }
            1 => {
                mprint!();
                success!("{}", output);
            }
            _ => {}
        }
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
