mod commands;
mod terminal;

use anyhow::Context;
use commands::{CommandLine, Settings, scan};
use sshsweep_common::config::Config;
use terminal::{format, logging, print};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    let cfg = Config::load(&commands.config)
        .with_context(|| format!("could not load {}", commands.config.display()))?;

    let (level, rejected) = cfg.log_level();
    logging::init_logging(level);
    match rejected {
        Some(raw) => warn!("Invalid log level '{raw}'. Setting log level to INFO."),
        None => info!("Log level set to {level}"),
    }

    let settings = commands.settings(&cfg)?;

    print::banner(settings.quiet);
    print_settings(&settings);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    scan::scan(&settings, cancel).await?;
    Ok(())
}

fn print_settings(settings: &Settings) {
    if settings.quiet > 0 {
        return;
    }

    print::header("sweep settings", settings.quiet);
    let options = &settings.options;
    print::setting("Subnet", settings.subnet.to_string());
    print::setting("Hosts", settings.subnet.host_count().to_string());
    print::setting("Username", settings.credential.username());
    print::setting("Concurrency", options.concurrency.to_string());
    print::setting("Timeout", format::human_duration(options.timeout));
    print::setting("Retries", options.retries.to_string());
    print::setting("Host keys", format::host_key_policy(&settings.host_keys));
}
