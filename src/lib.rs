//! Mirror a UVC camera onto a Linux framebuffer.
//!
//! Motion-JPEG frames are captured from a Video4Linux2 device through a ring of memory-mapped
//! kernel buffers, decoded, and written centered into the memory of a framebuffer device
//! (`/dev/fbX`). No display server is involved.
//!
//! The building blocks are usable on their own:
//!
//! * [`Device`] and [`io::mmap::Stream`] drive the capture side,
//! * [`Framebuffer`] (or any other [`Surface`]) receives the pixels,
//! * [`decode_and_present`] connects one compressed buffer to a surface,
//! * [`Mirror`] runs the whole loop.
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use uvc_lcd::{Config, Mirror};
//!
//! let shutdown = AtomicBool::new(false);
//! let mut mirror = Mirror::open(&Config::new("/dev/video0", "/dev/fb0"))?;
//! mirror.run(&shutdown)?;
//! # Ok::<(), uvc_lcd::Error>(())
//! ```

pub use v4l2_sys;

pub mod v4l2;

pub mod buffer;
pub mod io;
pub mod memory;
pub mod signal;

mod capability;
pub use capability::{Capabilities, Flags as CapabilityFlags};

mod composite;
pub use composite::{decode_and_present, present, Placement};

mod config;
pub use config::{Config, DEFAULT_POLL_INTERVAL};

mod decode;
pub use decode::{Decode, MjpegDecoder, Raster, DEFAULT_MAX_PIXELS};

mod device;
pub use device::{Device, Handle};

mod error;
pub use error::{DecodeError, Error, Result};

mod format;
pub use format::{Description as FormatDescription, DescriptionFlags, Format};

mod fourcc;
pub use fourcc::FourCC;

mod framebuffer;
pub use framebuffer::Framebuffer;

mod framesize;
pub use framesize::{Discrete, FrameSize, FrameSizeEnum, Stepwise};

mod mirror;
pub use mirror::{Mirror, Stats, Step};

mod poll;

mod surface;
pub use surface::{Channel, Geometry, MemorySurface, PixelLayout, Surface};
