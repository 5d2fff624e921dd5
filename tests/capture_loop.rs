use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uvc_lcd::buffer::{Flags, Metadata};
use uvc_lcd::io::ring::{Ring, State};
use uvc_lcd::io::traits::{CaptureStream, Stream};
use uvc_lcd::{
    Decode, DecodeError, Error, Geometry, MemorySurface, Mirror, Raster, Result, Step, Surface,
};

/// In-memory stand-in for a driver buffer queue
///
/// Buffers complete in the order they were queued, each carrying the next scripted frame.
struct FakeStream {
    ring: Ring,
    data: Vec<Vec<u8>>,
    meta: Vec<Metadata>,
    incoming: VecDeque<usize>,
    frames: VecDeque<(Vec<u8>, Flags)>,
    would_block: usize,
    sequence: u32,
    active: bool,
    drained: Arc<AtomicBool>,
}

impl FakeStream {
    fn new(len: usize, frames: Vec<(Vec<u8>, Flags)>) -> Self {
        let mut stream = FakeStream {
            ring: Ring::new(len),
            data: vec![Vec::new(); len],
            meta: vec![Metadata::default(); len],
            incoming: VecDeque::new(),
            frames: frames.into(),
            would_block: 0,
            sequence: 0,
            active: false,
            drained: Arc::new(AtomicBool::new(false)),
        };
        for index in 0..len {
            stream.queue(index).unwrap();
        }
        stream.start().unwrap();
        stream
    }
}

impl Stream for FakeStream {
    fn start(&mut self) -> Result<()> {
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.active = false;
        self.ring.reset();
        self.incoming.clear();
        Ok(())
    }
}

impl CaptureStream for FakeStream {
    fn poll(&mut self, _timeout: Option<Duration>) -> Result<bool> {
        let ready = self.active && !self.frames.is_empty() && !self.incoming.is_empty();
        if !ready {
            self.drained.store(true, Ordering::SeqCst);
        }
        Ok(ready)
    }

    fn queue(&mut self, index: usize) -> Result<()> {
        self.ring.mark_queued(index)?;
        self.incoming.push_back(index);
        Ok(())
    }

    fn dequeue(&mut self) -> Result<usize> {
        self.ring.check_dequeue()?;
        if self.would_block > 0 {
            self.would_block -= 1;
            return Err(Error::Dequeue(io::Error::from_raw_os_error(libc::EAGAIN)));
        }

        let index = match self.incoming.pop_front() {
            Some(index) => index,
            None => return Err(Error::Dequeue(io::Error::from_raw_os_error(libc::EINVAL))),
        };
        let (data, flags) = self.frames.pop_front().unwrap_or_default();
        self.meta[index] = Metadata {
            bytesused: data.len() as u32,
            flags,
            sequence: self.sequence,
        };
        self.data[index] = data;
        self.sequence += 1;

        self.ring.mark_held(index)?;
        Ok(index)
    }

    fn get(&self, index: usize) -> Option<&[u8]> {
        (self.ring.held() == Some(index)).then(|| &self.data[index][..])
    }

    fn get_meta(&self, index: usize) -> Option<&Metadata> {
        (self.ring.held() == Some(index)).then(|| &self.meta[index])
    }

    fn ring(&self) -> &Ring {
        &self.ring
    }
}

/// Decodes three-byte "frames" into a 4x2 raster of that colour
struct ColourDecoder;

impl Decode for ColourDecoder {
    fn decode(&mut self, data: &[u8]) -> std::result::Result<Raster, DecodeError> {
        match data {
            [] => Err(DecodeError::Empty),
            &[r, g, b] => Raster::new(4, 2, [r, g, b].repeat(8)),
            _ => Err(DecodeError::MissingInfo),
        }
    }
}

fn frame(rgb: [u8; 3]) -> (Vec<u8>, Flags) {
    (rgb.to_vec(), Flags::DONE)
}

fn mirror(frames: Vec<(Vec<u8>, Flags)>) -> Mirror<FakeStream, ColourDecoder, MemorySurface> {
    let surface = MemorySurface::new(Geometry::new(8, 4, 32).unwrap());
    Mirror::new(
        FakeStream::new(4, frames),
        ColourDecoder,
        surface,
        Duration::from_millis(10),
    )
}

fn assert_balanced(ring: &Ring) {
    assert!(ring.count(State::Held) <= 1);
    assert_eq!(
        ring.count(State::Queued) + ring.count(State::Held),
        ring.len()
    );
}

fn centre(mirror: &Mirror<FakeStream, ColourDecoder, MemorySurface>) -> u32 {
    mirror.surface().pixel(3, 1).unwrap()
}

#[test]
fn frames_are_presented_in_order() {
    let colours = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [1, 2, 3], [4, 5, 6], [7, 8, 9]];
    let mut mirror = mirror(colours.iter().map(|&c| frame(c)).collect());

    for rgb in colours {
        let step = mirror.step(None).unwrap();
        assert!(matches!(step, Step::Presented(_)));
        let expected = (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
        assert_eq!(centre(&mirror), expected);

        let ring = mirror.stream().ring();
        assert_eq!(ring.held(), None);
        assert_eq!(ring.count(State::Queued), 4);
        assert_balanced(ring);
    }

    assert_eq!(mirror.step(None).unwrap(), Step::Idle);
    assert_eq!(mirror.stats().presented, 6);
    assert_eq!(mirror.stats().skipped, 0);
}

#[test]
fn placement_is_reported() {
    let mut mirror = mirror(vec![frame([9, 9, 9])]);
    match mirror.step(None).unwrap() {
        Step::Presented(placement) => {
            assert_eq!((placement.width, placement.height), (4, 2));
            assert_eq!((placement.left, placement.top), (2, 1));
        }
        step => panic!("unexpected step {:?}", step),
    }
    assert_eq!(mirror.surface().pixel(0, 0), Some(0));
}

#[test]
fn undecodable_frame_is_skipped_and_requeued() {
    let mut mirror = mirror(vec![
        frame([255, 0, 0]),
        (b"garbage".to_vec(), Flags::DONE),
        (Vec::new(), Flags::DONE),
        frame([0, 0, 255]),
    ]);

    assert!(matches!(mirror.step(None).unwrap(), Step::Presented(_)));
    let shown = mirror.surface().pixels().to_vec();

    assert_eq!(mirror.step(None).unwrap(), Step::Skipped);
    assert_eq!(mirror.surface().pixels(), &shown[..]);
    assert_balanced(mirror.stream().ring());

    assert_eq!(mirror.step(None).unwrap(), Step::Skipped);
    assert_eq!(mirror.surface().pixels(), &shown[..]);

    assert!(matches!(mirror.step(None).unwrap(), Step::Presented(_)));
    assert_eq!(centre(&mirror), 0x0000_00ff);
    assert_eq!(mirror.stream().ring().count(State::Queued), 4);

    let stats = mirror.stats();
    assert_eq!((stats.presented, stats.skipped), (2, 2));
}

#[test]
fn corrupted_frame_is_not_decoded() {
    let mut mirror = mirror(vec![
        frame([255, 0, 0]),
        ([0, 255, 0].to_vec(), Flags::DONE | Flags::ERROR),
    ]);

    mirror.step(None).unwrap();
    assert_eq!(mirror.step(None).unwrap(), Step::Skipped);
    assert_eq!(centre(&mirror), 0x00ff_0000);
    assert_balanced(mirror.stream().ring());
}

#[test]
fn would_block_goes_back_to_waiting() {
    let mut stream = FakeStream::new(2, vec![frame([1, 1, 1])]);
    stream.would_block = 1;
    let mut mirror = Mirror::new(
        stream,
        ColourDecoder,
        MemorySurface::new(Geometry::new(8, 4, 16).unwrap()),
        Duration::from_millis(10),
    );

    assert_eq!(mirror.step(None).unwrap(), Step::Idle);
    assert_eq!(mirror.stream().ring().held(), None);
    assert!(matches!(mirror.step(None).unwrap(), Step::Presented(_)));
}

#[test]
fn second_dequeue_while_holding_is_rejected() {
    let mut stream = FakeStream::new(2, vec![frame([1, 1, 1]), frame([2, 2, 2])]);
    assert_eq!(stream.dequeue().unwrap(), 0);

    let err = stream.dequeue().unwrap_err();
    assert!(matches!(
        err,
        Error::SlotState {
            index: 0,
            state: State::Held,
            ..
        }
    ));
    assert!(!err.is_transient());
}

#[test]
fn run_until_shutdown() {
    let mut mirror = mirror((0..10u8).map(|i| frame([i, i, i])).collect());
    let drained = mirror.stream().drained.clone();

    let stats = mirror.run(&drained).unwrap();
    assert_eq!(stats.presented, 10);
    assert_eq!(stats.skipped, 0);
    assert_eq!(centre(&mirror), 0x0009_0909);

    // streaming is off and the driver gave every buffer back
    assert!(!mirror.stream().active);
    assert_eq!(mirror.stream().ring().count(State::Idle), 4);
}

#[test]
fn run_with_pending_shutdown_presents_nothing() {
    let mut mirror = mirror(vec![frame([1, 2, 3])]);
    let shutdown = AtomicBool::new(true);

    let stats = mirror.run(&shutdown).unwrap();
    assert_eq!(stats.presented, 0);
    assert!(mirror.surface().pixels().iter().all(|&b| b == 0));
}
