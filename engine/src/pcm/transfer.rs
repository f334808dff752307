//! Position arithmetic for the mmap ring.
//!
//! Hardware and application positions are frame counters that only move
//! forward and wrap at `boundary`, a multiple of the buffer size far larger
//! than the ring. All differences are taken modulo the boundary, so a value
//! that would be negative shows up as an availability larger than the
//! buffer, which is how an xrun is recognised.

use super::Stream;
use super::ioctl::PcmSetup;
use crate::error::{Error, Result};

pub fn default_boundary(buffer_size: usize) -> usize {
    let limit = isize::MAX as usize;
    if buffer_size == 0 || buffer_size >= limit / 2 {
        return limit;
    }
    let mut boundary = buffer_size;
    while boundary * 2 <= limit - buffer_size {
        boundary *= 2;
    }
    boundary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
    pub buffer_size: usize,
    pub boundary: usize,
}

impl Ring {
    pub fn new(buffer_size: usize, boundary: usize) -> Self {
        let boundary = if boundary == 0 {
            default_boundary(buffer_size)
        } else {
            boundary
        };
        Self {
            buffer_size,
            boundary,
        }
    }

    /// `pos + frames` modulo the boundary.
    pub fn add(&self, pos: usize, frames: usize) -> usize {
        let b = self.boundary;
        let pos = pos % b;
        let frames = frames % b;
        if pos >= b - frames {
            pos - (b - frames)
        } else {
            pos + frames
        }
    }

    /// `a - b` modulo the boundary, never negative.
    pub fn diff(&self, a: usize, b: usize) -> usize {
        let bd = self.boundary;
        let (a, b) = (a % bd, b % bd);
        if a >= b { a - b } else { bd - b + a }
    }

    pub fn playback_avail(&self, hw_ptr: usize, appl_ptr: usize) -> usize {
        self.diff(self.add(hw_ptr, self.buffer_size), appl_ptr)
    }

    pub fn capture_avail(&self, hw_ptr: usize, appl_ptr: usize) -> usize {
        self.diff(hw_ptr, appl_ptr)
    }

    /// Frames the application may transfer right now. May exceed the
    /// buffer size, which means the ring overran or underran.
    pub fn avail(&self, stream: Stream, hw_ptr: usize, appl_ptr: usize) -> usize {
        match stream {
            Stream::Playback => self.playback_avail(hw_ptr, appl_ptr),
            Stream::Capture => self.capture_avail(hw_ptr, appl_ptr),
        }
    }

    pub fn checked_avail(&self, stream: Stream, hw_ptr: usize, appl_ptr: usize) -> Result<usize> {
        let avail = self.avail(stream, hw_ptr, appl_ptr);
        if avail > self.buffer_size {
            return Err(Error::Xrun);
        }
        Ok(avail)
    }

    /// Frames owned by the hardware side: queued for playback, or already
    /// handed to the application for capture. Negative after an xrun.
    pub fn hw_avail(&self, stream: Stream, hw_ptr: usize, appl_ptr: usize) -> isize {
        self.buffer_size as isize - self.avail(stream, hw_ptr, appl_ptr) as isize
    }

    /// Number of frames a rewind of `frames` may actually move back.
    pub fn rewindable(&self, stream: Stream, hw_ptr: usize, appl_ptr: usize, frames: usize) -> usize {
        let hw_avail = self.hw_avail(stream, hw_ptr, appl_ptr);
        if hw_avail <= 0 {
            return 0;
        }
        frames.min(hw_avail as usize)
    }

    pub fn appl_forward(&self, appl_ptr: usize, frames: usize) -> usize {
        self.add(appl_ptr, frames)
    }

    pub fn appl_backward(&self, appl_ptr: usize, frames: usize) -> usize {
        self.diff(appl_ptr, frames)
    }

    pub fn ring_offset(&self, pos: usize) -> usize {
        if self.buffer_size == 0 {
            return 0;
        }
        pos % self.buffer_size
    }

    /// Contiguous frames from `pos` before the ring wraps, capped at `frames`.
    pub fn contiguous(&self, pos: usize, frames: usize) -> usize {
        frames.min(self.buffer_size - self.ring_offset(pos))
    }
}

fn unknown_format() -> Error {
    Error::invalid("setup has an unknown sample format")
}

/// Bytes taken by `frames` whole frames of `setup`'s format.
pub fn frames_to_bytes(setup: &PcmSetup, frames: usize) -> Result<usize> {
    let bpf = setup.bytes_per_frame().ok_or_else(unknown_format)?;
    frames
        .checked_mul(bpf)
        .ok_or_else(|| Error::invalid(format!("{frames} frames do not fit in memory")))
}

/// Bytes taken by one channel's samples for `frames` frames.
pub fn samples_to_bytes(setup: &PcmSetup, frames: usize) -> Result<usize> {
    let bps = setup.bytes_per_sample().ok_or_else(unknown_format)?;
    frames
        .checked_mul(bps)
        .ok_or_else(|| Error::invalid(format!("{frames} frames do not fit in memory")))
}

/// An interleaved transfer buffer has to hold every requested frame.
pub fn check_interleaved(setup: &PcmSetup, len: usize, frames: usize) -> Result<()> {
    let need = frames_to_bytes(setup, frames)?;
    if len < need {
        return Err(Error::invalid(format!(
            "buffer holds {len} bytes, {frames} frames need {need}"
        )));
    }
    Ok(())
}

/// A non-interleaved transfer takes exactly one buffer per channel, each
/// holding every requested frame.
pub fn check_planes(setup: &PcmSetup, lens: &[usize], frames: usize) -> Result<()> {
    if lens.len() != setup.channels as usize {
        return Err(Error::invalid(format!(
            "{} buffers for {} channels",
            lens.len(),
            setup.channels
        )));
    }
    let need = samples_to_bytes(setup, frames)?;
    if lens.iter().any(|len| *len < need) {
        return Err(Error::invalid(format!(
            "channel buffers must hold {need} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Ring {
        Ring::new(1024, 0)
    }

    #[test]
    fn playback_avail_is_free_space() {
        let r = ring();
        for hw in [0usize, 5, 1000, 4096, 77_777] {
            for fill in [0usize, 1, 512, 1023, 1024] {
                let appl = hw + fill;
                assert_eq!(r.playback_avail(hw, appl), 1024 - fill);
            }
        }
    }

    #[test]
    fn capture_avail_is_pending_frames() {
        let r = ring();
        for appl in [0usize, 5, 1000, 4096] {
            for pending in [0usize, 1, 512, 1024] {
                assert_eq!(r.capture_avail(appl + pending, appl), pending);
            }
        }
    }

    #[test]
    fn positions_wrap_at_the_boundary() {
        let r = Ring::new(8, 64);
        let hw = 60;
        let appl = r.appl_forward(hw, 6);
        assert_eq!(appl, 2);
        assert_eq!(r.playback_avail(hw, appl), 2);
        assert_eq!(r.capture_avail(r.add(appl, 3), appl), 3);
        assert_eq!(r.appl_backward(2, 4), 62);
    }

    #[test]
    fn underrun_and_overrun_are_xruns() {
        let r = ring();
        // hardware played past everything the application queued
        assert!(matches!(
            r.checked_avail(Stream::Playback, 2000, 900),
            Err(Error::Xrun)
        ));
        // capture ring filled beyond its size
        assert!(matches!(
            r.checked_avail(Stream::Capture, 2049, 1000),
            Err(Error::Xrun)
        ));
        assert_eq!(r.checked_avail(Stream::Capture, 2024, 1000).unwrap(), 1024);
    }

    #[test]
    fn rewind_is_clamped_to_queued_frames() {
        let r = ring();
        assert_eq!(r.rewindable(Stream::Playback, 100, 400, 1000), 300);
        assert_eq!(r.rewindable(Stream::Playback, 100, 400, 10), 10);
        assert_eq!(r.rewindable(Stream::Playback, 100, 100, 10), 0);
        assert_eq!(r.rewindable(Stream::Playback, 2000, 100, 10), 0);
        assert_eq!(r.rewindable(Stream::Capture, 400, 100, 2000), 1024 - 300);
    }

    #[test]
    fn contiguous_stops_at_ring_end() {
        let r = ring();
        assert_eq!(r.contiguous(1000, 100), 24);
        assert_eq!(r.contiguous(1024, 100), 100);
    }

    #[test]
    fn default_boundary_is_a_buffer_multiple() {
        for size in [1usize, 3, 1024, 4800] {
            let b = default_boundary(size);
            assert_eq!(b % size, 0);
            assert!(b <= isize::MAX as usize - size);
        }
    }

    fn stereo_s16() -> PcmSetup {
        PcmSetup {
            format: crate::pcm::format::FORMAT_S16_LE,
            channels: 2,
            buffer_size: 1024,
            ..PcmSetup::default()
        }
    }

    #[test]
    fn byte_sizes_never_wrap() {
        let setup = stereo_s16();
        assert_eq!(frames_to_bytes(&setup, 8).unwrap(), 32);
        assert_eq!(samples_to_bytes(&setup, 8).unwrap(), 16);
        assert!(matches!(
            frames_to_bytes(&setup, usize::MAX / 4 + 1),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            samples_to_bytes(&setup, usize::MAX),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            check_interleaved(&setup, 0, usize::MAX / 4 + 1),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn buffers_must_cover_the_request() {
        let setup = stereo_s16();
        assert!(check_interleaved(&setup, 16, 4).is_ok());
        assert!(check_interleaved(&setup, 15, 4).is_err());
        assert!(check_planes(&setup, &[8, 8], 4).is_ok());
        assert!(check_planes(&setup, &[8], 4).is_err());
        assert!(check_planes(&setup, &[8, 8, 8], 4).is_err());
        assert!(check_planes(&setup, &[8, 7], 4).is_err());
        let unknown = PcmSetup {
            format: -1,
            ..setup
        };
        assert!(check_interleaved(&unknown, 1024, 1).is_err());
    }
}
