use super::ioctl::{CardInfo, ElemInfo, ElemList, ElemValue, HwdepInfo, RawEvent, RawmidiInfo};
use crate::error::Result;
use crate::pcm::ioctl::PcmInfo;
use std::os::fd::RawFd;

/// A transport usable behind [`super::Ctl`].
pub trait CtlOps: Send {
    fn kind(&self) -> &'static str;
    fn close(self: Box<Self>) -> Result<()>;
    fn poll_descriptor(&self) -> RawFd;
    fn hw_info(&self) -> Result<CardInfo>;
    fn clist(&mut self, list: &mut ElemList<'_>) -> Result<()>;
    fn cinfo(&mut self, info: &mut ElemInfo) -> Result<()>;
    fn cread(&mut self, value: &mut ElemValue) -> Result<()>;
    fn cwrite(&mut self, value: &mut ElemValue) -> Result<()>;
    fn hwdep_info(&mut self, info: &mut HwdepInfo) -> Result<()>;
    fn pcm_info(&mut self, info: &mut PcmInfo) -> Result<()>;
    fn pcm_prefer_subdevice(&mut self, subdevice: i32) -> Result<()>;
    fn rawmidi_info(&mut self, info: &mut RawmidiInfo) -> Result<()>;
    fn rawmidi_prefer_subdevice(&mut self, subdevice: i32) -> Result<()>;

    /// Reads one pending event record. Returns the byte count the transport
    /// produced, `Ok(0)` when nothing is pending.
    fn read(&mut self, event: &mut RawEvent) -> Result<usize>;
}
