//! ysf2dmr - YSF to DMR gateway.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use ysf2dmr::bridge::Bridge;
use ysf2dmr::cli::Cli;
use ysf2dmr::config::{init_logging, Config};
use ysf2dmr::daemon::{daemonize, DaemonConfig};
use ysf2dmr::error::Result;
use ysf2dmr::gateway::Gateway;
use ysf2dmr::lookup::IdLookup;
use ysf2dmr::network::{DmrNetwork, HomebrewNetwork, YsfLink};
use ysf2dmr::signals::SignalHandler;
use ysf2dmr::VERSION;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_config {
        return match toml::to_string_pretty(&Config::example()) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("ysf2dmr: cannot render example configuration: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("ysf2dmr: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if let Some(format) = cli.format {
        config.log.format = format.as_str().into();
    }

    // Fork before any runtime threads exist.
    let daemon = config.general.daemon && !cli.foreground;
    let _pid_file = if daemon {
        daemonize(&DaemonConfig::from_general(&config.general))?
    } else {
        None
    };

    init_logging(&config.log)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    info!("ysf2dmr-{} starting", VERSION);
    info!(
        "Callsign {}, DMR ID {}, color code {}",
        config.general.callsign, config.dmr_network.id, config.dmr_network.color_code
    );
    info!(
        "Routing YSF to {} {} on slot {}, source IDs by {:?}",
        config.dmr_network.call_type,
        config.dmr_network.dst_id,
        config.dmr_network.slot.number(),
        config.dmr_network.source_id
    );
    info!(
        "Repeater {}:{}, master {}:{}, jitter {:?}",
        config.general.repeater_address,
        config.general.repeater_port,
        config.dmr_network.address,
        config.dmr_network.port,
        config.dmr_network.jitter
    );

    let lookup = match &config.id_lookup.file {
        Some(path) => IdLookup::load(path).unwrap_or_else(|e| {
            warn!("Cannot read DMR IDs from {}: {}", path.display(), e);
            IdLookup::empty()
        }),
        None => IdLookup::empty(),
    };
    let reload = lookup.start_reload_task(config.id_lookup.reload);

    let bridge = Bridge::new(
        config.routing_policy(),
        Arc::new(lookup.clone()),
        config.queue_capacity(),
    );

    let mut dmr = HomebrewNetwork::new(config.homebrew());
    dmr.set_config(config.repeater_info());
    dmr.set_options(&config.dmr_network.options);
    dmr.enable(true);

    let ysf = YsfLink::new(config.ysf_link());
    let mut gateway = Gateway::new(ysf, dmr, bridge, config.timing);

    if let Err(e) = gateway.open().await {
        error!("Cannot open the network links: {}", e);
        reload.abort();
        return Err(e);
    }

    let signals = SignalHandler::new().with_lookup(lookup);
    let listener = tokio::spawn({
        let signals = signals.clone();
        async move { signals.listen().await }
    });

    gateway.run(signals.shutdown_signal()).await;
    gateway.close().await;

    listener.abort();
    reload.abort();
    info!("ysf2dmr stopped");
    Ok(())
}
