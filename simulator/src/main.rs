use anyhow::Context;
use clap::Parser;
use gui_bridge::bridge::FeedBridge;
use gui_bridge::model::FeedCatalog;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SimulatorConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic civic feed server and offline refresh driver")]
struct Args {
    /// Run one refresh cycle per feed in-process and append a report
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load simulator settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    records: Option<usize>,
    #[arg(long)]
    latency_ms: Option<u64>,
    #[arg(long)]
    jitter_ms: Option<u64>,
    #[arg(long)]
    failure_rate: Option<f64>,
    /// Fraction of generated records published without an id
    #[arg(long)]
    anonymous_ratio: Option<f64>,
    /// Where the offline report is appended
    #[arg(long, default_value = "tools/data/offline_feeds.log")]
    report: PathBuf,
    /// Serve feeds over HTTP until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut SimulatorConfig) {
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(records) = self.records {
            config.records_per_feed = records;
        }
        if let Some(latency_ms) = self.latency_ms {
            config.latency_ms = latency_ms;
        }
        if let Some(jitter_ms) = self.jitter_ms {
            config.jitter_ms = jitter_ms;
        }
        if let Some(failure_rate) = self.failure_rate {
            config.failure_rate = failure_rate;
        }
        if let Some(anonymous_ratio) = self.anonymous_ratio {
            config.anonymous_ratio = anonymous_ratio;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    let bind = config.bind;
    let bridge = FeedBridge::new(FeedCatalog::build(config).context("building feed catalog")?);
    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    if args.offline {
        let runner = Runner::new(bridge.catalog());
        let results = runtime.block_on(runner.execute_all())?;

        let mut report = String::new();
        for result in &results {
            println!(
                "Offline run -> {}: {} ({} records, {} positioned)",
                result.feed, result.state, result.record_count, result.positioned
            );
            report.push_str(&result.summary_line());
        }

        if let Some(parent) = args.report.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.report)
            .with_context(|| format!("opening report {}", args.report.display()))?;
        file.write_all(report.as_bytes())?;
        info!("offline report appended to {}", args.report.display());
    }

    if args.serve {
        runtime.block_on(async {
            let server = tokio::spawn(bridge.serve(bind));
            println!("Feed bridge running on http://{} (Ctrl+C to stop)...", bind);
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            server.abort();
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
