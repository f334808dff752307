pub mod device;
pub mod format;
pub mod hw;
pub mod ioctl;
pub mod mmap;
pub mod ops;
pub mod state;
pub mod transfer;

pub use state::PcmState;

use crate::config;
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use ioctl::{
    ChannelInfo, ChannelParams, ChannelSetup, ParamsInfo, PcmInfo, PcmParams, PcmSetup, PcmStatus,
    STREAM_CAPTURE, STREAM_PLAYBACK, XFER_INTERLEAVED,
};
use nix::libc;
use ops::PcmBackend;
use std::{ops::BitOr, os::fd::RawFd, str::FromStr};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Playback,
    Capture,
}

impl Stream {
    pub fn from_raw(v: i32) -> Option<Self> {
        match v {
            STREAM_PLAYBACK => Some(Stream::Playback),
            STREAM_CAPTURE => Some(Stream::Capture),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Stream::Playback => STREAM_PLAYBACK,
            Stream::Capture => STREAM_CAPTURE,
        }
    }

    /// Letter the device file name ends with.
    pub fn suffix(self) -> char {
        match self {
            Stream::Playback => 'p',
            Stream::Capture => 'c',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stream::Playback => "playback",
            Stream::Capture => "capture",
        }
    }
}

impl FromStr for Stream {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "playback" | "p" => Ok(Stream::Playback),
            "capture" | "c" => Ok(Stream::Capture),
            other => Err(Error::invalid(format!("unknown stream '{other}'"))),
        }
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Flags a stream is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode(u32);

impl OpenMode {
    pub const BLOCK: OpenMode = OpenMode(0);
    pub const NONBLOCK: OpenMode = OpenMode(1 << 0);
    pub const ASYNC: OpenMode = OpenMode(1 << 1);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: OpenMode) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    pub fn without(self, other: OpenMode) -> OpenMode {
        OpenMode(self.0 & !other.0)
    }
}

impl BitOr for OpenMode {
    type Output = OpenMode;

    fn bitor(self, rhs: OpenMode) -> OpenMode {
        OpenMode(self.0 | rhs.0)
    }
}

/// Where readiness signals go once async mode is on. Unset fields mean
/// SIGIO and the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AsyncNotify {
    pub signal: Option<i32>,
    pub pid: Option<i32>,
}

impl AsyncNotify {
    pub fn signal(&self) -> i32 {
        self.signal.unwrap_or(libc::SIGIO)
    }

    pub fn pid(&self) -> i32 {
        self.pid
            .unwrap_or_else(|| nix::unistd::getpid().as_raw())
    }
}

/// An open audio stream. Checks the stream state and the caller's buffers
/// before handing requests to its backend.
pub struct Pcm {
    name: String,
    stream: Stream,
    mode: OpenMode,
    backend: Option<Box<dyn PcmBackend>>,
    setup: Option<PcmSetup>,
}

impl std::fmt::Debug for Pcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pcm")
            .field("name", &self.name)
            .field("stream", &self.stream)
            .field("mode", &self.mode)
            .field("kind", &self.kind())
            .field("setup", &self.setup)
            .finish()
    }
}

impl Pcm {
    pub fn open(name: &str, stream: Stream, mode: OpenMode) -> Result<Self> {
        let conf = config::update()?;
        Resolver::system().open_pcm(&conf, name, stream, mode)
    }

    pub fn from_backend(
        name: impl Into<String>,
        stream: Stream,
        mode: OpenMode,
        backend: Box<dyn PcmBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            stream,
            mode,
            backend: Some(backend),
            setup: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn kind(&self) -> &'static str {
        self.backend.as_ref().map_or("closed", |b| b.kind())
    }

    fn backend(&self) -> Result<&dyn PcmBackend> {
        self.backend.as_deref().ok_or_else(|| Error::BadState {
            op: "access",
            state: PcmState::Closed.name().to_string(),
        })
    }

    fn backend_mut(&mut self) -> Result<&mut (dyn PcmBackend + 'static)> {
        self.backend.as_deref_mut().ok_or_else(|| Error::BadState {
            op: "access",
            state: PcmState::Closed.name().to_string(),
        })
    }

    /// The committed setup; set once parameters were accepted.
    pub fn setup(&self) -> Result<PcmSetup> {
        self.setup
            .ok_or_else(|| Error::invalid(format!("{}: no parameters set", self.name)))
    }

    pub fn poll_descriptor(&self) -> Result<RawFd> {
        Ok(self.backend()?.poll_descriptor())
    }

    pub fn info(&self) -> Result<PcmInfo> {
        self.backend()?.info()
    }

    pub fn params_info(&self, info: &mut ParamsInfo) -> Result<()> {
        self.backend()?.params_info(info)
    }

    /// Proposes `params`. On rejection the device leaves the failing
    /// fields in `params.fail_mask`.
    pub fn params(&mut self, params: &mut PcmParams) -> Result<()> {
        self.setup = None;
        let backend = self.backend_mut()?;
        backend.params(params)?;
        let setup = backend.setup()?;
        self.setup = Some(setup);
        Ok(())
    }

    /// Reads the setup back from the backend.
    pub fn refresh_setup(&mut self) -> Result<PcmSetup> {
        let setup = self.backend_mut()?.setup()?;
        self.setup = Some(setup);
        Ok(setup)
    }

    pub fn channel_info(&self, info: &mut ChannelInfo) -> Result<()> {
        self.backend()?.channel_info(info)
    }

    pub fn channel_params(&mut self, params: &mut ChannelParams) -> Result<()> {
        self.backend_mut()?.channel_params(params)
    }

    pub fn channel_setup(&self, setup: &mut ChannelSetup) -> Result<()> {
        self.backend()?.channel_setup(setup)
    }

    pub fn status(&self) -> Result<PcmStatus> {
        self.backend()?.status()
    }

    pub fn state(&self) -> PcmState {
        self.backend
            .as_ref()
            .map_or(PcmState::Closed, |b| b.state())
    }

    pub fn delay(&self) -> Result<isize> {
        self.backend()?.delay()
    }

    pub fn prepare(&mut self) -> Result<()> {
        self.state().check_prepare()?;
        self.backend_mut()?.prepare()
    }

    pub fn start(&mut self) -> Result<()> {
        self.state().check_start()?;
        self.backend_mut()?.start()
    }

    /// Stops the stream at once, discarding pending frames.
    pub fn drop_frames(&mut self) -> Result<()> {
        self.state().check_drop()?;
        self.backend_mut()?.drop_frames()
    }

    pub fn drain(&mut self) -> Result<()> {
        self.state().check_drain()?;
        self.backend_mut()?.drain()
    }

    pub fn pause(&mut self, enable: bool) -> Result<()> {
        self.state().check_pause(enable)?;
        if !self.setup()?.can_pause() {
            return Err(Error::invalid(format!("{}: pause not supported", self.name)));
        }
        self.backend_mut()?.pause(enable)
    }

    pub fn nonblock(&mut self, nonblock: bool) -> Result<()> {
        self.backend_mut()?.nonblock(nonblock)?;
        self.mode = if nonblock {
            self.mode | OpenMode::NONBLOCK
        } else {
            self.mode.without(OpenMode::NONBLOCK)
        };
        Ok(())
    }

    pub fn set_async(&mut self, notify: Option<AsyncNotify>) -> Result<()> {
        let enable = notify.is_some();
        self.backend_mut()?.set_async(notify)?;
        self.mode = if enable {
            self.mode | OpenMode::ASYNC
        } else {
            self.mode.without(OpenMode::ASYNC)
        };
        Ok(())
    }

    fn transfer_setup(&self, direction: Stream, interleaved: bool) -> Result<PcmSetup> {
        if self.stream != direction {
            return Err(Error::invalid(format!(
                "{}: cannot {} a {} stream",
                self.name,
                if direction == Stream::Playback { "write" } else { "read" },
                self.stream
            )));
        }
        let setup = self.setup()?;
        if setup.interleaved() != interleaved {
            return Err(Error::invalid(format!(
                "{}: transfer mode is {}interleaved",
                self.name,
                if setup.interleaved() { "" } else { "non-" }
            )));
        }
        self.state().check_transfer(self.stream)?;
        Ok(setup)
    }

    fn named(&self, err: Error) -> Error {
        match err {
            Error::Invalid(msg) => Error::Invalid(format!("{}: {msg}", self.name)),
            other => other,
        }
    }

    pub fn writei(&mut self, buf: &[u8], frames: usize) -> Result<usize> {
        let setup = self.transfer_setup(Stream::Playback, true)?;
        transfer::check_interleaved(&setup, buf.len(), frames).map_err(|e| self.named(e))?;
        self.backend_mut()?.writei(buf, frames)
    }

    pub fn readi(&mut self, buf: &mut [u8], frames: usize) -> Result<usize> {
        let setup = self.transfer_setup(Stream::Capture, true)?;
        transfer::check_interleaved(&setup, buf.len(), frames).map_err(|e| self.named(e))?;
        self.backend_mut()?.readi(buf, frames)
    }

    pub fn writen(&mut self, bufs: &[&[u8]], frames: usize) -> Result<usize> {
        let setup = self.transfer_setup(Stream::Playback, false)?;
        let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
        transfer::check_planes(&setup, &lens, frames).map_err(|e| self.named(e))?;
        self.backend_mut()?.writen(bufs, frames)
    }

    pub fn readn(&mut self, bufs: &mut [&mut [u8]], frames: usize) -> Result<usize> {
        let setup = self.transfer_setup(Stream::Capture, false)?;
        let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
        transfer::check_planes(&setup, &lens, frames).map_err(|e| self.named(e))?;
        self.backend_mut()?.readn(bufs, frames)
    }

    /// Moves the application position back by up to `frames`. Returns how
    /// far it moved; never fails.
    pub fn rewind(&mut self, frames: usize) -> usize {
        match self.backend_mut() {
            Ok(b) => b.rewind(frames),
            Err(_) => 0,
        }
    }

    /// Frames ready for transfer, or [`Error::Xrun`].
    ///
    /// On a capture stream whose ring is private to this library (the
    /// device reported no mmap shape of its own) this also reads every
    /// captured frame into that ring, so it is not a pure query.
    pub fn avail_update(&mut self) -> Result<usize> {
        self.backend_mut()?.avail_update()
    }

    pub fn mmap(&mut self) -> Result<()> {
        self.setup()?;
        self.backend_mut()?.mmap()
    }

    pub fn munmap(&mut self) -> Result<()> {
        self.backend_mut()?.munmap()
    }

    /// Commits `frames` frames of the ring: hands them to the device on
    /// playback, releases them on capture.
    pub fn mmap_forward(&mut self, frames: usize) -> Result<usize> {
        let setup = self.setup()?;
        if frames > setup.buffer_frames() {
            return Err(Error::invalid(format!(
                "{}: cannot forward {frames} frames in a {} frame ring",
                self.name,
                setup.buffer_frames()
            )));
        }
        self.state().check_transfer(self.stream)?;
        self.backend_mut()?.mmap_forward(frames)
    }

    fn ring_window(&mut self, frames: usize) -> Result<(usize, usize)> {
        let setup = self.setup()?;
        if setup.xfer_mode != XFER_INTERLEAVED {
            return Err(Error::invalid(format!(
                "{}: ring copies need interleaved frames",
                self.name
            )));
        }
        if frames > setup.buffer_frames() {
            return Err(Error::invalid(format!(
                "{}: {frames} frames exceed the {} frame ring",
                self.name,
                setup.buffer_frames()
            )));
        }
        let bytes = transfer::frames_to_bytes(&setup, frames).map_err(|e| self.named(e))?;
        let appl = self.appl_ptr();
        let offset = transfer::frames_to_bytes(&setup, appl % setup.buffer_frames().max(1))
            .map_err(|e| self.named(e))?;
        Ok((offset, bytes))
    }

    /// Copies `frames` interleaved frames into the ring at the application
    /// position. Positions are left alone; follow with [`Pcm::mmap_forward`].
    pub fn mmap_write(&mut self, src: &[u8], frames: usize) -> Result<usize> {
        let (offset, bytes) = self.ring_window(frames)?;
        if src.len() < bytes {
            return Err(Error::invalid(format!(
                "{}: source holds {} bytes, need {bytes}",
                self.name,
                src.len()
            )));
        }
        let area = self.mapped_ring()?;
        area.write_at(Some(&src[..bytes]), offset, bytes);
        Ok(frames)
    }

    /// Fills `frames` frames at the application position with zeroes.
    pub fn mmap_silence(&mut self, frames: usize) -> Result<usize> {
        let (offset, bytes) = self.ring_window(frames)?;
        self.mapped_ring()?.write_at(None, offset, bytes);
        Ok(frames)
    }

    /// Copies `frames` interleaved frames out of the ring at the
    /// application position.
    pub fn mmap_read(&mut self, dst: &mut [u8], frames: usize) -> Result<usize> {
        let (offset, bytes) = self.ring_window(frames)?;
        if dst.len() < bytes {
            return Err(Error::invalid(format!(
                "{}: destination holds {} bytes, need {bytes}",
                self.name,
                dst.len()
            )));
        }
        self.mapped_ring()?.read_at(&mut dst[..bytes], offset);
        Ok(frames)
    }

    fn mapped_ring(&mut self) -> Result<&mut mmap::RingArea> {
        let name = self.name.clone();
        self.backend_mut()?
            .ring_area()
            .ok_or_else(|| Error::invalid(format!("{name}: ring is not mapped")))
    }

    pub fn set_avail_min(&mut self, frames: usize) -> Result<()> {
        self.backend_mut()?.set_avail_min(frames)
    }

    pub fn appl_ptr(&self) -> usize {
        self.backend.as_ref().map_or(0, |b| b.appl_ptr())
    }

    pub fn hw_ptr(&self) -> usize {
        self.backend.as_ref().map_or(0, |b| b.hw_ptr())
    }

    /// Releases the backend. Every resource is released even when one of
    /// them fails; the first failure is returned.
    pub fn close(mut self) -> Result<()> {
        match self.backend.take() {
            Some(backend) => backend.close(),
            None => Ok(()),
        }
    }
}

impl Drop for Pcm {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.take()
            && let Err(e) = backend.close()
        {
            error!("{}: failed to close stream: {e}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_names() {
        assert_eq!("Playback".parse::<Stream>().unwrap(), Stream::Playback);
        assert_eq!("c".parse::<Stream>().unwrap(), Stream::Capture);
        assert!(matches!("both".parse::<Stream>(), Err(Error::Invalid(_))));
        assert_eq!(Stream::from_raw(STREAM_CAPTURE), Some(Stream::Capture));
        assert_eq!(Stream::from_raw(7), None);
    }

    #[test]
    fn open_mode_flags() {
        let mode = OpenMode::NONBLOCK | OpenMode::ASYNC;
        assert!(mode.contains(OpenMode::NONBLOCK));
        assert!(mode.contains(OpenMode::ASYNC));
        assert!(!OpenMode::BLOCK.contains(OpenMode::BLOCK));
        assert_eq!(mode.without(OpenMode::NONBLOCK), OpenMode::ASYNC);
        assert_eq!(OpenMode::default(), OpenMode::BLOCK);
    }

    #[test]
    fn async_notify_defaults() {
        let notify = AsyncNotify::default();
        assert_eq!(notify.signal(), libc::SIGIO);
        assert_eq!(notify.pid(), std::process::id() as i32);
        let explicit = AsyncNotify {
            signal: Some(libc::SIGUSR1),
            pid: Some(42),
        };
        assert_eq!(explicit.signal(), libc::SIGUSR1);
        assert_eq!(explicit.pid(), 42);
    }
}
