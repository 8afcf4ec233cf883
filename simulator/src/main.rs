use anyhow::Context;
use clap::Parser;
use peer_bridge::bridge::PeerBridge;
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SessionConfig;
use workflow::runner::Runner;

mod generator;
mod peer_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Plays a wearable shot-tracking session against a companion peer")]
struct Args {
    /// Load a scripted session from YAML
    #[arg(long)]
    session: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// How long the generated signal runs before the closing steps
    #[arg(long, default_value_t = 5000)]
    duration_ms: u64,
    /// Offset of a synthetic shot spike (repeatable)
    #[arg(long = "shot-at-ms")]
    shot_at_ms: Vec<u64>,
    /// Write the session summary as JSON
    #[arg(long)]
    report: Option<PathBuf>,
    /// Keep the peer bridge alive after the script finishes
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value_t = 9000)]
    port: u16,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let session_config = if let Some(path) = args.session.as_ref() {
        SessionConfig::load(path)?
    } else {
        SessionConfig::from_args(args.seed, args.duration_ms, args.shot_at_ms.clone())
    };

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    runtime.block_on(async move {
        let runner = Runner::new(session_config);
        let mut session = runner.launch();
        let result = runner.play(&mut session).await?;

        println!(
            "Session -> outbound {}, shots {}, samples {}, dropped {}, send failures {}",
            result.outbound.len(),
            result.shot_notifications,
            result.metrics.samples_processed,
            result.metrics.samples_dropped,
            result.metrics.send_failures,
        );
        for message in &result.outbound {
            println!("  {}", serde_json::to_string(message)?);
        }

        if let Some(report_path) = args.report.as_ref() {
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let report = serde_json::to_string_pretty(&result)?;
            fs::write(report_path, report)
                .with_context(|| format!("writing report {}", report_path.display()))?;
        }

        if args.serve {
            println!(
                "Peer bridge on http://127.0.0.1:{} (Ctrl+C to stop)...",
                args.port
            );
            let bridge = PeerBridge::new(session);
            tokio::select! {
                _ = bridge.serve(args.port) => {}
                result = signal::ctrl_c() => {
                    result.context("awaiting Ctrl+C to exit")?;
                }
            }
        }

        Ok::<(), anyhow::Error>(())
    })
}
