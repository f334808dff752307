#![allow(dead_code)]

use nix::libc;
use sndhw_engine::ctl::ioctl::{
    CardInfo, ElemInfo, ElemList, ElemValue, HwdepInfo, RawEvent, RawmidiInfo,
};
use sndhw_engine::ctl::ops::CtlOps;
use sndhw_engine::pcm::device::{DeviceOpener, PcmDevice};
use sndhw_engine::pcm::hw::{HwAddress, HwPcm};
use sndhw_engine::pcm::ioctl::*;
use sndhw_engine::pcm::mmap::MappedRegion;
use sndhw_engine::{AsyncNotify, Ctl, Error, OpenMode, Result, Stream};
use std::{
    io,
    os::fd::RawFd,
    ptr,
    sync::{Arc, Mutex, MutexGuard},
};

pub const DATA_BYTES: usize = 1 << 16;

/// What a fake device does and what it saw.
#[derive(Debug)]
pub struct FakeState {
    pub version: i32,
    /// Subdevice reported by the n-th open; the last entry repeats.
    pub subdevices: Vec<i32>,
    pub setup: PcmSetup,
    pub fail_control_unmap: bool,
    pub short_status: bool,
    pub delay_fails: bool,
    /// Overrides the frame count transfers report.
    pub report_frames: Option<usize>,
    pub capture_byte: u8,

    pub opens: usize,
    pub closes: usize,
    pub ctl_closes: usize,
    pub prefer_hints: Vec<i32>,
    pub requests: Vec<String>,
    pub written: Vec<u8>,
    pub frames_read: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            version: PCM_VERSION_MAX,
            subdevices: vec![0],
            setup: interleaved_setup(1024, MMAP_INTERLEAVED),
            fail_control_unmap: false,
            short_status: false,
            delay_fails: false,
            report_frames: None,
            capture_byte: 0xab,
            opens: 0,
            closes: 0,
            ctl_closes: 0,
            prefer_hints: Vec::new(),
            requests: Vec::new(),
            written: Vec::new(),
            frames_read: 0,
        }
    }
}

/// Stereo S16 frames, four bytes each.
pub fn interleaved_setup(buffer: u64, shape: i32) -> PcmSetup {
    PcmSetup {
        format: sndhw_engine::pcm::format::FORMAT_S16_LE,
        rate: 48_000,
        channels: 2,
        xfer_mode: XFER_INTERLEAVED,
        mmap_shape: shape,
        xrun_mode: XRUN_NONE,
        ready_mode: READY_FRAGMENT,
        info_flags: INFO_MMAP,
        buffer_size: buffer as libc::c_ulong,
        frag_size: (buffer / 4) as libc::c_ulong,
        ..PcmSetup::default()
    }
}

struct Memory {
    status: *mut MmapStatus,
    control: *mut MmapControl,
    data: *mut u8,
}

unsafe impl Send for Memory {}
unsafe impl Sync for Memory {}

impl Drop for Memory {
    fn drop(&mut self) {
        unsafe {
            drop(Box::from_raw(self.status));
            drop(Box::from_raw(self.control));
            drop(Vec::from_raw_parts(self.data, DATA_BYTES, DATA_BYTES));
        }
    }
}

/// A card with one stream device, backed by heap memory instead of a
/// driver.
#[derive(Clone)]
pub struct Fake {
    state: Arc<Mutex<FakeState>>,
    memory: Arc<Memory>,
}

impl Fake {
    pub fn new(state: FakeState) -> Self {
        let mut data = vec![0u8; DATA_BYTES];
        let memory = Memory {
            status: Box::into_raw(Box::default()),
            control: Box::into_raw(Box::default()),
            data: data.as_mut_ptr(),
        };
        std::mem::forget(data);
        Self {
            state: Arc::new(Mutex::new(state)),
            memory: Arc::new(memory),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn set_state(&self, state: i32) {
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.memory.status).state), state) };
    }

    pub fn set_hw_ptr(&self, pos: usize) {
        unsafe {
            ptr::write_volatile(
                ptr::addr_of_mut!((*self.memory.status).hw_ptr),
                pos as libc::c_ulong,
            )
        };
    }

    pub fn set_appl_ptr(&self, pos: usize) {
        unsafe {
            ptr::write_volatile(
                ptr::addr_of_mut!((*self.memory.control).appl_ptr),
                pos as libc::c_ulong,
            )
        };
    }

    pub fn appl_ptr(&self) -> usize {
        unsafe { ptr::read_volatile(ptr::addr_of!((*self.memory.control).appl_ptr)) as usize }
    }

    pub fn avail_min(&self) -> usize {
        unsafe { ptr::read_volatile(ptr::addr_of!((*self.memory.control).avail_min)) as usize }
    }

    pub fn open(&self, subdevice: Option<i32>, stream: Stream) -> Result<HwPcm<FakeDevice>> {
        let addr = HwAddress {
            card: 0,
            device: 0,
            subdevice,
        };
        HwPcm::open_with(self, addr, stream, OpenMode::BLOCK)
    }

    fn advance_appl(&self, frames: usize) {
        self.set_appl_ptr(self.appl_ptr() + frames);
    }
}

impl DeviceOpener for Fake {
    type Device = FakeDevice;

    fn open_ctl(&self, _card: i32) -> Result<Ctl> {
        Ok(Ctl::from_backend(
            "fake",
            Box::new(FakeCtl {
                fake: self.clone(),
            }),
        ))
    }

    fn open_pcm(&self, path: &str, _mode: OpenMode) -> Result<FakeDevice> {
        let mut st = self.state();
        st.opens += 1;
        st.requests.push(format!("open {path}"));
        let idx = (st.opens - 1).min(st.subdevices.len().saturating_sub(1));
        let subdevice = st.subdevices.get(idx).copied().unwrap_or(0);
        Ok(FakeDevice {
            fake: self.clone(),
            subdevice,
            fd: 100 + st.opens as RawFd,
        })
    }
}

pub struct FakeDevice {
    fake: Fake,
    subdevice: i32,
    fd: RawFd,
}

impl FakeDevice {
    fn log(&self, what: &str) {
        self.fake.state().requests.push(what.to_string());
    }

    fn transferred(&self, frames: usize) -> usize {
        self.fake.state().report_frames.unwrap_or(frames)
    }
}

impl PcmDevice for FakeDevice {
    fn raw_fd(&self) -> RawFd {
        self.fd
    }

    fn pversion(&self) -> Result<i32> {
        self.log("pversion");
        Ok(self.fake.state().version)
    }

    fn info(&self, info: &mut PcmInfo) -> Result<()> {
        self.log("info");
        info.subdevice = self.subdevice;
        info.subdevices_count = 2;
        Ok(())
    }

    fn params_info(&self, _info: &mut ParamsInfo) -> Result<()> {
        self.log("params_info");
        Ok(())
    }

    fn params(&self, _params: &mut PcmParams) -> Result<()> {
        self.log("params");
        Ok(())
    }

    fn setup(&self, setup: &mut PcmSetup) -> Result<()> {
        self.log("setup");
        *setup = self.fake.state().setup;
        Ok(())
    }

    fn channel_info(&self, _info: &mut ChannelInfo) -> Result<()> {
        self.log("channel_info");
        Ok(())
    }

    fn channel_params(&self, _params: &mut ChannelParams) -> Result<()> {
        self.log("channel_params");
        Ok(())
    }

    fn channel_setup(&self, _setup: &mut ChannelSetup) -> Result<()> {
        self.log("channel_setup");
        Ok(())
    }

    fn status(&self, status: &mut PcmStatus) -> Result<()> {
        self.log("status");
        status.appl_ptr = self.fake.appl_ptr() as libc::c_ulong;
        Ok(())
    }

    fn delay(&self) -> Result<isize> {
        self.log("delay");
        if self.fake.state().delay_fails {
            return Err(Error::Xrun);
        }
        Ok(0)
    }

    fn prepare(&self) -> Result<()> {
        self.log("prepare");
        self.fake.set_state(STATE_PREPARED);
        Ok(())
    }

    fn start(&self) -> Result<()> {
        self.log("start");
        self.fake.set_state(STATE_RUNNING);
        Ok(())
    }

    fn drop_frames(&self) -> Result<()> {
        self.log("drop");
        self.fake.set_state(STATE_SETUP);
        Ok(())
    }

    fn drain(&self) -> Result<()> {
        self.log("drain");
        self.fake.set_state(STATE_SETUP);
        Ok(())
    }

    fn pause(&self, enable: bool) -> Result<()> {
        self.log(if enable { "pause" } else { "resume" });
        self.fake
            .set_state(if enable { STATE_PAUSED } else { STATE_RUNNING });
        Ok(())
    }

    unsafe fn writei(&self, buf: &[u8], frames: usize) -> Result<usize> {
        self.log("writei");
        self.fake.state().written.extend_from_slice(buf);
        self.fake.advance_appl(frames);
        Ok(self.transferred(frames))
    }

    unsafe fn readi(&self, buf: &mut [u8], frames: usize) -> Result<usize> {
        self.log("readi");
        let byte = {
            let mut st = self.fake.state();
            st.frames_read += frames;
            st.capture_byte
        };
        buf.fill(byte);
        self.fake.advance_appl(frames);
        Ok(self.transferred(frames))
    }

    unsafe fn writen(&self, bufs: &[&[u8]], frames: usize) -> Result<usize> {
        self.log("writen");
        {
            let mut st = self.fake.state();
            for b in bufs {
                st.written.extend_from_slice(b);
            }
        }
        self.fake.advance_appl(frames);
        Ok(self.transferred(frames))
    }

    unsafe fn readn(&self, bufs: &mut [&mut [u8]], frames: usize) -> Result<usize> {
        self.log("readn");
        let byte = {
            let mut st = self.fake.state();
            st.frames_read += frames;
            st.capture_byte
        };
        for b in bufs.iter_mut() {
            b.fill(byte);
        }
        self.fake.advance_appl(frames);
        Ok(self.transferred(frames))
    }

    fn set_nonblock(&self, nonblock: bool) -> Result<()> {
        self.log(&format!("nonblock {nonblock}"));
        Ok(())
    }

    fn set_async(&self, notify: Option<AsyncNotify>) -> Result<()> {
        match notify {
            Some(n) => self.log(&format!("async {} {}", n.signal(), n.pid())),
            None => self.log("async off"),
        }
        Ok(())
    }

    fn map(&self, len: usize, offset: libc::off_t, _writable: bool) -> Result<MappedRegion> {
        let mem = &self.fake.memory;
        let (what, ptr, len) = match offset {
            MMAP_OFFSET_STATUS if self.fake.state().short_status => {
                ("status", mem.status.cast::<libc::c_void>(), 1)
            }
            MMAP_OFFSET_STATUS => ("status", mem.status.cast(), len),
            MMAP_OFFSET_CONTROL => ("control", mem.control.cast(), len),
            MMAP_OFFSET_DATA => ("data", mem.data.cast(), len.min(DATA_BYTES)),
            _ => return Err(Error::invalid("bad offset")),
        };
        self.log(&format!("map {what}"));
        Ok(unsafe { MappedRegion::from_raw(ptr, len) }.unwrap())
    }

    fn unmap(&self, region: MappedRegion) -> Result<()> {
        let mem = &self.fake.memory;
        let p = region.as_ptr();
        let what = if p == mem.status.cast() {
            "status"
        } else if p == mem.control.cast() {
            "control"
        } else {
            "data"
        };
        self.log(&format!("unmap {what}"));
        if what == "control" && self.fake.state().fail_control_unmap {
            return Err(io::Error::from_raw_os_error(libc::EINVAL).into());
        }
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.log("close");
        self.fake.state().closes += 1;
        Ok(())
    }
}

struct FakeCtl {
    fake: Fake,
}

fn unsupported<T>() -> Result<T> {
    Err(Error::NoOperation("fake control".into()))
}

impl CtlOps for FakeCtl {
    fn kind(&self) -> &'static str {
        "fake"
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.fake.state().ctl_closes += 1;
        Ok(())
    }

    fn poll_descriptor(&self) -> RawFd {
        -1
    }

    fn hw_info(&self) -> Result<CardInfo> {
        unsupported()
    }

    fn clist(&mut self, _list: &mut ElemList<'_>) -> Result<()> {
        unsupported()
    }

    fn cinfo(&mut self, _info: &mut ElemInfo) -> Result<()> {
        unsupported()
    }

    fn cread(&mut self, _value: &mut ElemValue) -> Result<()> {
        unsupported()
    }

    fn cwrite(&mut self, _value: &mut ElemValue) -> Result<()> {
        unsupported()
    }

    fn hwdep_info(&mut self, _info: &mut HwdepInfo) -> Result<()> {
        unsupported()
    }

    fn pcm_info(&mut self, _info: &mut PcmInfo) -> Result<()> {
        unsupported()
    }

    fn pcm_prefer_subdevice(&mut self, subdevice: i32) -> Result<()> {
        self.fake.state().prefer_hints.push(subdevice);
        Ok(())
    }

    fn rawmidi_info(&mut self, _info: &mut RawmidiInfo) -> Result<()> {
        unsupported()
    }

    fn rawmidi_prefer_subdevice(&mut self, _subdevice: i32) -> Result<()> {
        unsupported()
    }

    fn read(&mut self, _event: &mut RawEvent) -> Result<usize> {
        Ok(0)
    }
}
