use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use uvc_lcd::io::mmap::MAX_BUFFERS;
use uvc_lcd::{signal, Config, Mirror};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Capture device, e.g. /dev/video0
    capture_device: PathBuf,
    /// Framebuffer device, e.g. /dev/fb0
    framebuffer_device: PathBuf,
    /// Number of capture buffers to request
    #[arg(short, long, default_value_t = MAX_BUFFERS,
          value_parser = clap::value_parser!(u32).range(1..=MAX_BUFFERS as i64))]
    buffers: u32,
    /// Longest wait for a frame before checking for shutdown
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::new(&args.capture_device, &args.framebuffer_device)
        .buffers(args.buffers)
        .poll_interval(Duration::from_millis(args.poll_interval_ms));

    let shutdown = match signal::install() {
        Ok(flag) => flag,
        Err(e) => {
            error!("failed to install signal handlers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut mirror = match Mirror::open(&config) {
        Ok(mirror) => mirror,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match mirror.run(shutdown) {
        Ok(_) => {
            info!("shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
