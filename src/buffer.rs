use std::fmt;

use bitflags::bitflags;
use v4l2_sys::v4l2_buffer;

/// Buffer type
///
/// Only single-planar capture buffers are exchanged with the driver.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    VideoCapture = 1,
}

bitflags! {
    #[allow(clippy::unreadable_literal)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Buffer is mapped
        const MAPPED                = 0x00000001;
        /// Buffer is queued for processing
        const QUEUED                = 0x00000002;
        /// Buffer is ready
        const DONE                  = 0x00000004;
        /// Image is a keyframe (I-frame)
        const KEYFRAME              = 0x00000008;
        /// Image is a P-frame
        const PFRAME                = 0x00000010;
        /// Image is a B-frame
        const BFRAME                = 0x00000020;
        /// Buffer is ready, but the data contained within is corrupted
        const ERROR                 = 0x00000040;
        /// Timecode field is valid
        const TIMECODE              = 0x00000100;
        /// Buffer is prepared for queuing
        const PREPARED              = 0x00000400;
        /// mem2mem encoder/decoder
        const LAST                  = 0x00100000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Flags {
        Flags::from_bits_truncate(flags)
    }
}

impl From<Flags> for u32 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Buffer metadata as reported by the driver when a buffer is dequeued
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Number of bytes occupied by the data in the buffer
    pub bytesused: u32,
    /// Buffer flags
    pub flags: Flags,
    /// Sequence number, counting the frames
    pub sequence: u32,
}

impl Default for Flags {
    fn default() -> Self {
        Flags::empty()
    }
}

impl Metadata {
    /// Whether the driver marked the frame as corrupted
    pub fn is_corrupted(&self) -> bool {
        self.flags.contains(Flags::ERROR)
    }
}

impl From<&v4l2_buffer> for Metadata {
    fn from(buf: &v4l2_buffer) -> Self {
        Metadata {
            bytesused: buf.bytesused,
            flags: Flags::from(buf.flags),
            sequence: buf.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_raw_buffer() {
        let mut raw: v4l2_buffer = unsafe { std::mem::zeroed() };
        raw.bytesused = 4096;
        raw.flags = 0x0000_0041;
        raw.sequence = 17;

        let meta = Metadata::from(&raw);
        assert_eq!(meta.bytesused, 4096);
        assert_eq!(meta.sequence, 17);
        assert!(meta.flags.contains(Flags::MAPPED));
        assert!(meta.is_corrupted());
    }

    #[test]
    fn capture_type_code() {
        assert_eq!(Type::VideoCapture as u32, 1);
    }

    #[test]
    fn unknown_flags_are_dropped() {
        let flags = Flags::from(0x8000_0004);
        assert_eq!(flags, Flags::DONE);
    }
}
