use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::mmap::MAX_BUFFERS;

/// Default wait for a frame before the shutdown flag is checked again
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runtime settings of a [`crate::Mirror`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capture node, e.g. "/dev/video0"
    pub capture_device: PathBuf,
    /// Framebuffer node, e.g. "/dev/fb0"
    pub display_device: PathBuf,
    /// Number of capture buffers to request, within `1..=MAX_BUFFERS`
    pub buffer_count: u32,
    /// Upper bound for a single wait on the capture device
    pub poll_interval: Duration,
}

impl Config {
    /// Returns a config with the default buffer count and poll interval
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use uvc_lcd::Config;
    ///
    /// let config = Config::new("/dev/video0", "/dev/fb0")
    ///     .buffers(4)
    ///     .poll_interval(Duration::from_millis(100));
    /// assert_eq!(config.buffer_count, 4);
    /// ```
    pub fn new<C: AsRef<Path>, D: AsRef<Path>>(capture: C, display: D) -> Self {
        Config {
            capture_device: capture.as_ref().to_path_buf(),
            display_device: display.as_ref().to_path_buf(),
            buffer_count: MAX_BUFFERS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the buffer count, clamped to `1..=MAX_BUFFERS`
    pub fn buffers(mut self, count: u32) -> Self {
        self.buffer_count = count.clamp(1, MAX_BUFFERS);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new("/dev/video0", "/dev/fb0");
        assert_eq!(config.capture_device, PathBuf::from("/dev/video0"));
        assert_eq!(config.display_device, PathBuf::from("/dev/fb0"));
        assert_eq!(config.buffer_count, 32);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn buffer_count_is_clamped() {
        let config = Config::new("a", "b");
        assert_eq!(config.clone().buffers(0).buffer_count, 1);
        assert_eq!(config.clone().buffers(8).buffer_count, 8);
        assert_eq!(config.buffers(1000).buffer_count, MAX_BUFFERS);
    }
}
