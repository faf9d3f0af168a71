use clap::Parser;
use tokio_util::sync::CancellationToken;

use avpipe::layout::GridLayout;
use avpipe::source::{AvSource, FrameSource};

mod config;
mod pipeline;
#[cfg(test)]
mod pipeline_test;

use config::{H264Profile, StreamConfig};
use pipeline::Pipeline;

/// Composite live video sources into one grid and stream it as H.264 over
/// RTMP.
#[derive(Parser)]
#[command(name = "camgrid", version)]
struct Cli {
    /// Source URL or device path, one per grid slot (repeat up to 4 times)
    #[arg(short = 'i', long = "input", required = true)]
    inputs: Vec<String>,

    /// Output RTMP server
    #[arg(short, long, default_value = "rtmp://localhost/live/stream")]
    output: String,

    /// Frames per second
    #[arg(short, long, default_value_t = 30)]
    fps: u32,

    /// Canvas width
    #[arg(short, long, default_value_t = 2560)]
    width: u32,

    /// Canvas height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Stream bitrate in bits per second
    #[arg(short, long, default_value_t = 300_000)]
    bitrate: usize,

    /// H.264 codec profile
    #[arg(short, long, value_enum, default_value_t = H264Profile::High444)]
    profile: H264Profile,

    /// Print debug output, including FFmpeg's own log
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    if let Err(e) = run(cli).await {
        eprintln!("camgrid: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    avpipe::init()?;
    if cli.verbose {
        ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Debug);
    }

    let config = StreamConfig {
        inputs: cli.inputs,
        output: cli.output,
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
        bitrate: cli.bitrate,
        profile: cli.profile,
    };
    config.validate()?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("shutdown requested");
                cancel.cancel();
            }
        });
    }

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let layout = GridLayout::uniform(config.width, config.height, config.inputs.len())?;
        let mut sources: Vec<Box<dyn FrameSource + Send>> =
            Vec::with_capacity(config.inputs.len());
        for (slot, url) in config.inputs.iter().enumerate() {
            let rect = layout
                .slot(slot)
                .ok_or_else(|| anyhow::anyhow!("no slot for source {slot}"))?;
            log::info!(
                "source {}: {} -> {}x{} at ({}, {})",
                slot,
                url,
                rect.width,
                rect.height,
                rect.x,
                rect.y
            );
            sources.push(Box::new(AvSource::open(url, None, rect.width, rect.height)?));
        }

        log::info!(
            "streaming {}x{} @ {} fps to {}",
            config.width,
            config.height,
            config.fps,
            config.output
        );
        let pipeline = Pipeline::new(&config, layout, sources)?;
        pipeline.run(&cancel)
    })
    .await?
}
