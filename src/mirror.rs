//! The capture-to-display loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::composite::{decode_and_present, Placement};
use crate::config::Config;
use crate::decode::{Decode, MjpegDecoder};
use crate::device::Device;
use crate::error::DecodeError;
use crate::format::Format;
use crate::fourcc::FourCC;
use crate::framebuffer::Framebuffer;
use crate::io::mmap;
use crate::io::traits::{CaptureStream, Stream as _};
use crate::surface::Surface;
use crate::{Error, Result};

/// Outcome of a single loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No buffer became ready in time
    Idle,
    /// A frame was decoded and written to the surface
    Presented(Placement),
    /// A buffer was dequeued but its frame was dropped
    Skipped,
}

/// Frame counters of a running mirror
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub presented: u64,
    pub skipped: u64,
}

/// Mirrors frames from a capture stream onto a surface
///
/// Every dequeued buffer is handed back to the driver before the next one is taken, whether
/// or not its frame could be presented.
pub struct Mirror<S, D, T> {
    stream: S,
    decoder: D,
    surface: T,
    poll_interval: Duration,
    stats: Stats,
}

impl Mirror<mmap::Stream, MjpegDecoder, Framebuffer> {
    /// Opens both devices and starts streaming
    ///
    /// The capture format is negotiated at the display resolution. Anything opened before a
    /// failing step is released again.
    pub fn open(config: &Config) -> Result<Self> {
        let surface = Framebuffer::open(&config.display_device)?;
        let geometry = surface.geometry();

        let dev = Device::with_path(&config.capture_device)?;
        let caps = dev.query_caps().map_err(|e| Error::UnsupportedDevice {
            path: config.capture_device.clone(),
            reason: format!("capability query failed: {}", e),
        })?;
        info!("capture {}: {}", config.capture_device.display(), caps);
        if !caps.supports_streaming_capture() {
            return Err(Error::UnsupportedDevice {
                path: config.capture_device.clone(),
                reason: format!("no streaming video capture ({})", caps.effective()),
            });
        }

        log_formats(&dev);

        let requested = Format::new(geometry.width, geometry.height, FourCC::MJPG);
        let format = dev
            .set_format(&requested)
            .map_err(|e| Error::FormatNegotiation(format!("{}: {}", requested, e)))?;
        if format.fourcc != FourCC::MJPG {
            return Err(Error::FormatNegotiation(format!(
                "requested {}, driver chose {}",
                requested, format
            )));
        }
        info!("capture format: {}", format);

        let mut stream = mmap::Stream::with_buffers(&dev, config.buffer_count)?;
        stream.enqueue_all()?;
        stream.start()?;

        // headers claiming far more than was negotiated are treated as corrupt
        let negotiated = format.width as usize * format.height as usize;
        let max_pixels = negotiated.max(geometry.width as usize * geometry.height as usize) * 4;
        debug!("decoding frames of up to {} pixels", max_pixels);

        Ok(Mirror::new(
            stream,
            MjpegDecoder::with_max_pixels(max_pixels),
            surface,
            config.poll_interval,
        ))
    }
}

fn log_formats(dev: &Device) {
    let formats = match dev.enum_formats() {
        Ok(formats) => formats,
        Err(e) => {
            debug!("format enumeration failed: {}", e);
            return;
        }
    };

    for desc in &formats {
        debug!("format {}", desc);
        if let Ok(sizes) = dev.enum_framesizes(desc.fourcc) {
            for size in sizes {
                debug!("  {}", size);
            }
        }
    }

    if !formats.iter().any(|desc| desc.fourcc == FourCC::MJPG) {
        warn!("device does not advertise {}", FourCC::MJPG);
    }
}

impl<S, D, T> Mirror<S, D, T>
where
    S: CaptureStream,
    D: Decode,
    T: Surface,
{
    /// Assembles a mirror from an already streaming source
    pub fn new(stream: S, decoder: D, surface: T, poll_interval: Duration) -> Self {
        Mirror {
            stream,
            decoder,
            surface,
            poll_interval,
            stats: Stats::default(),
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn surface(&self) -> &T {
        &self.surface
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Waits up to `timeout` for a frame and presents it
    pub fn step(&mut self, timeout: Option<Duration>) -> Result<Step> {
        if !self.stream.poll(timeout)? {
            return Ok(Step::Idle);
        }

        let index = match self.stream.dequeue() {
            Ok(index) => index,
            Err(e) if e.is_transient() => return Ok(Step::Idle),
            Err(e) => return Err(e),
        };

        let outcome = self.process(index);
        self.stream.queue(index)?;

        let step = outcome?;
        match step {
            Step::Presented(_) => self.stats.presented += 1,
            Step::Skipped => self.stats.skipped += 1,
            Step::Idle => {}
        }
        Ok(step)
    }

    fn process(&mut self, index: usize) -> Result<Step> {
        let meta = self.stream.get_meta(index).copied().unwrap_or_default();
        if meta.is_corrupted() {
            warn!("skipping frame {}: {}", meta.sequence, DecodeError::Corrupted(index as u32));
            return Ok(Step::Skipped);
        }

        let data = self.stream.get(index).unwrap_or_default();
        match decode_and_present(&mut self.decoder, data, &mut self.surface) {
            Ok(placement) => Ok(Step::Presented(placement)),
            Err(e) if e.is_frame_local() => {
                warn!("skipping frame {}: {}", meta.sequence, e);
                Ok(Step::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    /// Presents frames until `shutdown` is set, then stops streaming
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<Stats> {
        while !shutdown.load(Ordering::SeqCst) {
            self.step(Some(self.poll_interval))?;
        }

        self.stream.stop()?;
        info!(
            "stopped after {} frames ({} skipped)",
            self.stats.presented, self.stats.skipped
        );
        Ok(self.stats)
    }
}
