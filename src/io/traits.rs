use std::time::Duration;

use crate::buffer::Metadata;
use crate::io::ring::Ring;
use crate::Result;

/// Streaming I/O
pub trait Stream {
    /// Start streaming, takes exclusive ownership of a device
    fn start(&mut self) -> Result<()>;

    /// Stop streaming, the driver gives up all queued buffers
    fn stop(&mut self) -> Result<()>;
}

/// Capture side of a buffer ring
///
/// Buffers are addressed by index. A buffer becomes readable through [`CaptureStream::get`]
/// once it was dequeued and stays so until it is queued again.
pub trait CaptureStream: Stream {
    /// Wait until a buffer can be dequeued
    ///
    /// Returns `false` when the timeout expired first. `None` waits indefinitely.
    fn poll(&mut self, timeout: Option<Duration>) -> Result<bool>;

    /// Insert a buffer into the drivers' incoming queue
    fn queue(&mut self, index: usize) -> Result<()>;

    /// Remove a buffer from the drivers' outgoing queue
    fn dequeue(&mut self) -> Result<usize>;

    /// Get the valid data of a held buffer
    fn get(&self, index: usize) -> Option<&[u8]>;

    /// Get the metadata of a held buffer
    fn get_meta(&self, index: usize) -> Option<&Metadata>;

    /// Ownership state of all buffers
    fn ring(&self) -> &Ring;
}
