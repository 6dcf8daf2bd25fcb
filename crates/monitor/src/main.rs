//! EDU-FOCUS Attention Monitor - Trace Replay Entry Point

use attention::AttentionConfig;
use monitor::{init_logging, MonitorConfig, MonitorSession, ReplaySource};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let trace_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => return Err("usage: edufocus-monitor <trace.json> [config-file]".into()),
    };
    let config_path = args.next().map(PathBuf::from);

    info!("=== EDU-FOCUS Attention Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let attention = AttentionConfig::load(config_path.as_deref())?;
    let source = ReplaySource::from_path(&trace_path)?;

    let mut session = MonitorSession::new(attention, MonitorConfig::default())?;
    session.start(source)?;

    loop {
        tokio::select! {
            update = session.next_status() => match update {
                Some(update) => println!(
                    "{:>6} {:>9.3}s  {}",
                    update.sequence,
                    update.timestamp.as_secs_f64(),
                    update.status.colored_line()
                ),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    session.stop().await?;
    info!("Detection stopped. Ready to start again.");
    Ok(())
}
