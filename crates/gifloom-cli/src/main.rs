//! gifloom - demo driver for the frame dispatch pipeline.
//!
//! Submits synthetic frames, lets a jittery demo encoder finish them out of
//! order, and prints the payload sizes in sequence order.

mod demo;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use gifloom_core::config::PipelineConfig;
use gifloom_core::domain::{Dimensions, FrameOptions};
use gifloom_core::impls::{TaskWorkerFactory, TracingEventSink};
use gifloom_core::ports::{Frame, FrameHandle};
use gifloom_core::PipelineBuilder;

use crate::demo::{RunLengthEncoder, gradient};

const DEFAULT_WIDTH: u32 = 64;
const DEFAULT_HEIGHT: u32 = 48;

#[derive(Parser, Debug)]
#[command(name = "gifloom")]
#[command(version, about = "Encode frames in parallel, collect them in order", long_about = None)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "GIFLOOM_CONFIG")]
    config: Option<String>,

    /// Number of frames to submit
    #[arg(short, long, default_value_t = 12)]
    frames: u64,

    /// Worker count (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Frame width (overrides config)
    #[arg(long)]
    width: Option<u32>,

    /// Frame height (overrides config)
    #[arg(long)]
    height: Option<u32>,

    /// Upper bound of the random per-frame encode delay
    #[arg(long, default_value_t = 40)]
    jitter_ms: u64,

    /// Abort after this many frames have been submitted
    #[arg(long)]
    abort_after: Option<u64>,

    /// Encode each frame against the previous one
    #[arg(long)]
    inter_frame: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config from {path}"))?,
        None => PipelineConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.inter_frame |= args.inter_frame;
    config.width = args.width.or(config.width).or(Some(DEFAULT_WIDTH));
    config.height = args.height.or(config.height).or(Some(DEFAULT_HEIGHT));
    config.validate()?;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("gifloom_core={level},gifloom_cli={level},warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(args.verbose || config.debug);

    let inter_frame = config.inter_frame;
    let dims = config
        .dimensions()
        .unwrap_or(Dimensions::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));
    info!(frames = args.frames, workers = config.workers, %dims, "starting");

    let factory = TaskWorkerFactory::from_config(RunLengthEncoder::new(args.jitter_ms), &config);
    let pipeline = PipelineBuilder::new(config)
        .with_event_sink(Arc::new(TracingEventSink))
        .build(&factory)?;

    for i in 0..args.frames {
        if args.abort_after == Some(i) {
            warn!(submitted = i, "aborting as requested");
            pipeline.abort();
            break;
        }
        let mut options = FrameOptions::default().with_delay_ms(100);
        if inter_frame && i > 0 {
            options = options.with_inter_frame();
        }
        if i + 1 == args.frames {
            options = options.mark_last();
        }
        let frame = Frame::new(FrameHandle::Pixels(gradient(dims, i)), options);
        pipeline.submit(frame).await?;
    }

    if pipeline.is_aborted() {
        let status = pipeline.status().await?;
        println!("{}", serde_json::to_string_pretty(&status)?);
        pipeline.shutdown().await;
        return Ok(());
    }

    let frames = pipeline.finish().await?;
    for frame in &frames {
        println!("{}\t{} bytes", frame.index, frame.payload.len());
    }
    let status = pipeline.status().await?;
    info!("{}", status.summary());
    println!("{}", serde_json::to_string_pretty(&status)?);

    pipeline.shutdown().await;
    Ok(())
}
