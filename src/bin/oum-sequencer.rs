/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Entry point for the UDP sequencer.

use clap::Parser;
use oum_sequencer::config::SequencerConfig;
use oum_sequencer::emitter::{Emitter, UdpEmitter};
use oum_sequencer::logging::{LogFormat, init_tracing};
use oum_sequencer::sequencer::Sequencer;
use oum_sequencer::server::UdpFrontend;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[clap(
    name = "oum-sequencer",
    about = "Ordered Unreliable Multicast sequencer",
    long_about = r#"Ordered Unreliable Multicast sequencer

Listens on every destination address in the provisioning file, stamps each
request with the next sequence number of its group and forwards it to all
replicas of that group.

Logging:
    Use the RUST_LOG environment variable to configure the desired logging level.
    For example:

    RUST_LOG=oum_sequencer=debug oum-sequencer -c sequencer.json
"#,
    version
)]
struct Args {
    /// Path to the JSON provisioning file
    #[clap(long, short, env = "OUM_SEQUENCER_CONFIG")]
    config: PathBuf,

    /// Local address of the socket stamped requests are sent from
    #[clap(long, default_value = "0.0.0.0:0")]
    emit_addr: SocketAddr,

    /// Log output format
    #[clap(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Seconds between diagnostic reports, 0 disables them
    #[clap(long, default_value_t = 10)]
    stats_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    init_tracing(args.log_format, "info")?;

    if let Err(e) = run(args).await {
        error!(error = %e, "sequencer failed");
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), BoxError> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting oum-sequencer"
    );

    let config = SequencerConfig::from_file(&args.config)?;
    let emitter = UdpEmitter::bind(args.emit_addr).await?;
    info!(emit_addr = %emitter.local_addr()?, "emitter bound");

    let sequencer = Arc::new(Sequencer::new(emitter, &config)?);
    let frontend = UdpFrontend::bind(Arc::clone(&sequencer)).await?.spawn();

    let reporter = (args.stats_interval > 0).then(|| {
        tokio::spawn(report_stats(
            Arc::clone(&sequencer),
            Duration::from_secs(args.stats_interval),
        ))
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    let received = frontend.shutdown().await?;
    let stats = serde_json::to_string(&sequencer.stats())?;
    info!(received, %stats, counters = ?sequencer.counters(), "sequencer stopped");
    Ok(())
}

async fn report_stats<E: Emitter>(sequencer: Arc<Sequencer<E>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match serde_json::to_string(&sequencer.stats()) {
            Ok(stats) => info!(
                session = ?sequencer.session(),
                %stats,
                counters = ?sequencer.counters(),
                "sequencer stats"
            ),
            Err(e) => error!(error = %e, "failed to serialize stats"),
        }
    }
}
