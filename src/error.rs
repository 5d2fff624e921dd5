use std::{io, path::PathBuf};

use thiserror::Error;

use crate::io::ring::State;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up or driving the capture-to-display pipeline
///
/// Every variant except [`Error::FrameDecode`] is fatal for the mirror loop.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open {}: {source}", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a usable capture device: {reason}", path.display())]
    UnsupportedDevice { path: PathBuf, reason: String },

    #[error("failed to query display geometry: {0}")]
    GeometryQuery(String),

    #[error("failed to map display memory ({len} bytes): {source}")]
    Mapping {
        len: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to negotiate capture format: {0}")]
    FormatNegotiation(String),

    #[error("failed to allocate {requested} capture buffers: {source}")]
    BufferAllocation {
        requested: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to map capture buffer {index}: {source}")]
    BufferMap {
        index: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to queue buffer {index}: {source}")]
    Queue {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to dequeue buffer: {0}")]
    Dequeue(#[source] io::Error),

    #[error("failed to start streaming: {0}")]
    StreamStart(#[source] io::Error),

    #[error("failed to stop streaming: {0}")]
    StreamStop(#[source] io::Error),

    #[error("failed to wait for a frame: {0}")]
    Wait(#[source] io::Error),

    #[error("failed to decode frame: {0}")]
    FrameDecode(#[from] DecodeError),

    #[error("buffer {index} is {state}, expected {expected}")]
    SlotState {
        index: usize,
        state: State,
        expected: State,
    },

    #[error("buffer index {index} out of range (pool of {len})")]
    SlotRange { index: usize, len: usize },
}

impl Error {
    /// Whether the operation may succeed when simply retried
    ///
    /// Only dequeue failures caused by a non-blocking device without a ready buffer or by an
    /// interrupting signal are considered transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Dequeue(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Whether the error only affects the current frame
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Error::FrameDecode(_))
    }
}

/// Reasons a single compressed frame could not be turned into a raster
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty buffer")]
    Empty,

    #[error(transparent)]
    Jpeg(#[from] jpeg_decoder::Error),

    #[error("decoder produced no image information")]
    MissingInfo,

    #[error("frame of {width}x{height} exceeds the limit of {limit} pixels")]
    TooLarge { width: u32, height: u32, limit: usize },

    #[error("unsupported decoder output {0}")]
    UnsupportedPixelFormat(String),

    #[error("decoder produced {actual} bytes, expected {expected}")]
    Truncated { expected: usize, actual: usize },

    #[error("driver flagged buffer {0} as corrupted")]
    Corrupted(u32),
}
