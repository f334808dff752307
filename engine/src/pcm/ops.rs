use super::ioctl::{
    ChannelInfo, ChannelParams, ChannelSetup, ParamsInfo, PcmInfo, PcmParams, PcmSetup, PcmStatus,
};
use super::mmap::RingArea;
use super::{AsyncNotify, PcmState};
use crate::error::Result;
use std::os::fd::RawFd;

/// Operations that may block, allocate or reconfigure the stream.
pub trait PcmOps {
    fn kind(&self) -> &'static str;
    fn close(self: Box<Self>) -> Result<()>;
    fn poll_descriptor(&self) -> RawFd;
    fn info(&self) -> Result<PcmInfo>;
    fn params_info(&self, info: &mut ParamsInfo) -> Result<()>;
    fn params(&mut self, params: &mut PcmParams) -> Result<()>;
    fn setup(&mut self) -> Result<PcmSetup>;
    fn channel_info(&self, info: &mut ChannelInfo) -> Result<()>;
    fn channel_params(&mut self, params: &mut ChannelParams) -> Result<()>;
    fn channel_setup(&self, setup: &mut ChannelSetup) -> Result<()>;
    fn nonblock(&mut self, nonblock: bool) -> Result<()>;
    fn set_async(&mut self, notify: Option<AsyncNotify>) -> Result<()>;
    fn mmap(&mut self) -> Result<()>;
    fn munmap(&mut self) -> Result<()>;
    fn ring_area(&mut self) -> Option<&mut RingArea>;
}

/// Operations on the transfer hot path. Positions and counts are frames.
pub trait PcmFastOps {
    fn status(&self) -> Result<PcmStatus>;
    fn state(&self) -> PcmState;
    fn delay(&self) -> Result<isize>;
    fn prepare(&mut self) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn drop_frames(&mut self) -> Result<()>;
    fn drain(&mut self) -> Result<()>;
    fn pause(&mut self, enable: bool) -> Result<()>;
    fn rewind(&mut self, frames: usize) -> usize;
    fn writei(&mut self, buf: &[u8], frames: usize) -> Result<usize>;
    fn writen(&mut self, bufs: &[&[u8]], frames: usize) -> Result<usize>;
    fn readi(&mut self, buf: &mut [u8], frames: usize) -> Result<usize>;
    fn readn(&mut self, bufs: &mut [&mut [u8]], frames: usize) -> Result<usize>;
    fn avail_update(&mut self) -> Result<usize>;
    fn mmap_forward(&mut self, frames: usize) -> Result<usize>;
    fn set_avail_min(&mut self, frames: usize) -> Result<()>;
    fn appl_ptr(&self) -> usize;
    fn hw_ptr(&self) -> usize;
}

/// A transport usable behind [`super::Pcm`].
pub trait PcmBackend: PcmOps + PcmFastOps + Send {}

impl<T: PcmOps + PcmFastOps + Send> PcmBackend for T {}
