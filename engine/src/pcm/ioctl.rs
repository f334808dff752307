use super::format::cstr_fixed;
use nix::libc;

pub const fn protocol_version(major: i32, minor: i32, subminor: i32) -> i32 {
    (major << 16) | (minor << 8) | subminor
}

pub const fn protocol_major(version: i32) -> i32 {
    (version >> 16) & 0xffff
}

pub const fn protocol_minor(version: i32) -> i32 {
    (version >> 8) & 0xff
}

/// True when a device speaking `found` cannot be driven by code written
/// against `supported`: the majors differ or the device is newer in minor.
pub const fn protocol_incompatible(found: i32, supported: i32) -> bool {
    protocol_major(found) != protocol_major(supported)
        || protocol_minor(found) > protocol_minor(supported)
}

pub const PCM_VERSION_MAX: i32 = protocol_version(2, 0, 0);

/// fcntl command selecting the signal delivered for O_ASYNC readiness.
/// Linux only; libc does not export it.
pub const F_SETSIG: libc::c_int = 10;

pub const MMAP_OFFSET_DATA: libc::off_t = 0x0000_0000;
pub const MMAP_OFFSET_STATUS: libc::off_t = 0x8000_0000;
pub const MMAP_OFFSET_CONTROL: libc::off_t = 0x8100_0000;

pub const STREAM_PLAYBACK: i32 = 0;
pub const STREAM_CAPTURE: i32 = 1;

pub const STATE_OPEN: i32 = 0;
pub const STATE_SETUP: i32 = 1;
pub const STATE_PREPARED: i32 = 2;
pub const STATE_RUNNING: i32 = 3;
pub const STATE_XRUN: i32 = 4;
pub const STATE_DRAINING: i32 = 5;
pub const STATE_PAUSED: i32 = 6;
pub const STATE_CLOSED: i32 = 7;

pub const XFER_INTERLEAVED: i32 = 0;
pub const XFER_NONINTERLEAVED: i32 = 1;

pub const MMAP_UNSPECIFIED: i32 = 0;
pub const MMAP_INTERLEAVED: i32 = 1;
pub const MMAP_NONINTERLEAVED: i32 = 2;

pub const XRUN_NONE: i32 = 0;
pub const XRUN_FRAGMENT: i32 = 1;
pub const XRUN_ASAP: i32 = 2;

pub const READY_FRAGMENT: i32 = 0;
pub const READY_ASAP: i32 = 1;

pub const INFO_PAUSE: u32 = 0x0000_0001;
pub const INFO_MMAP: u32 = 0x0000_0002;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespec {
    pub tv_sec: libc::c_long,
    pub tv_nsec: libc::c_long,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PcmInfo {
    pub card: libc::c_int,
    pub device: libc::c_int,
    pub subdevice: libc::c_int,
    pub stream: libc::c_int,
    pub id: [u8; 64],
    pub name: [u8; 80],
    pub subname: [u8; 32],
    pub subdevices_count: libc::c_int,
    pub subdevices_avail: libc::c_int,
    pub reserved: [u8; 64],
}

impl PcmInfo {
    pub fn new() -> Self {
        Self {
            card: 0,
            device: 0,
            subdevice: 0,
            stream: 0,
            id: [0; 64],
            name: [0; 80],
            subname: [0; 32],
            subdevices_count: 0,
            subdevices_avail: 0,
            reserved: [0; 64],
        }
    }

    pub fn id(&self) -> String {
        cstr_fixed(&self.id)
    }

    pub fn name(&self) -> String {
        cstr_fixed(&self.name)
    }

    pub fn subname(&self) -> String {
        cstr_fixed(&self.subname)
    }
}

impl Default for PcmInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamsInfo {
    pub formats: u64,
    pub min_rate: libc::c_uint,
    pub max_rate: libc::c_uint,
    pub min_channels: libc::c_uint,
    pub max_channels: libc::c_uint,
    pub min_fragment_size: libc::c_ulong,
    pub max_fragment_size: libc::c_ulong,
    pub min_fragments: libc::c_uint,
    pub max_fragments: libc::c_uint,
    pub flags: libc::c_uint,
    pub fail_mask: libc::c_uint,
    pub reserved: [u8; 32],
}

pub const PARAMS_FAIL_FORMAT: u32 = 1 << 0;
pub const PARAMS_FAIL_RATE: u32 = 1 << 1;
pub const PARAMS_FAIL_CHANNELS: u32 = 1 << 2;
pub const PARAMS_FAIL_BUFFER_SIZE: u32 = 1 << 3;
pub const PARAMS_FAIL_FRAG_SIZE: u32 = 1 << 4;
pub const PARAMS_FAIL_XFER_MODE: u32 = 1 << 5;
pub const PARAMS_FAIL_MMAP_SHAPE: u32 = 1 << 6;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmParams {
    pub format: libc::c_int,
    pub rate: libc::c_uint,
    pub channels: libc::c_uint,
    pub xfer_mode: libc::c_int,
    pub mmap_shape: libc::c_int,
    pub xrun_mode: libc::c_int,
    pub ready_mode: libc::c_int,
    pub buffer_size: libc::c_ulong,
    pub frag_size: libc::c_ulong,
    pub avail_min: libc::c_ulong,
    pub xfer_min: libc::c_ulong,
    pub xfer_align: libc::c_ulong,
    pub fail_mask: libc::c_uint,
    pub fail_reason: libc::c_int,
    pub reserved: [u8; 32],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcmSetup {
    pub format: libc::c_int,
    pub rate: libc::c_uint,
    pub channels: libc::c_uint,
    pub xfer_mode: libc::c_int,
    pub mmap_shape: libc::c_int,
    pub xrun_mode: libc::c_int,
    pub ready_mode: libc::c_int,
    pub info_flags: libc::c_uint,
    pub buffer_size: libc::c_ulong,
    pub frag_size: libc::c_ulong,
    pub boundary: libc::c_ulong,
    pub avail_min: libc::c_ulong,
    pub xfer_min: libc::c_ulong,
    pub xfer_align: libc::c_ulong,
    pub mmap_bytes: libc::c_ulong,
    pub reserved: [u8; 32],
}

impl PcmSetup {
    pub fn buffer_frames(&self) -> usize {
        self.buffer_size as usize
    }

    /// Boundary the position counters wrap at; falls back to the largest
    /// power-of-two multiple of the buffer size when the device left it 0.
    pub fn boundary_frames(&self) -> usize {
        if self.boundary != 0 {
            return self.boundary as usize;
        }
        super::transfer::default_boundary(self.buffer_frames())
    }

    pub fn bytes_per_sample(&self) -> Option<usize> {
        super::format::bytes_per_sample(self.format)
    }

    pub fn bytes_per_frame(&self) -> Option<usize> {
        super::format::bytes_per_frame(self.format, self.channels)
    }

    pub fn interleaved(&self) -> bool {
        self.xfer_mode == XFER_INTERLEAVED
    }

    pub fn can_pause(&self) -> bool {
        (self.info_flags & INFO_PAUSE) != 0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelArea {
    /// Byte offset of the area inside the data region.
    pub addr: libc::c_ulong,
    /// Bit offset of the first sample.
    pub first: libc::c_uint,
    /// Bit distance between consecutive samples.
    pub step: libc::c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelInfo {
    pub channel: libc::c_int,
    pub first: libc::c_uint,
    pub step: libc::c_uint,
    pub offset: libc::c_ulong,
    pub reserved: [u8; 32],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelParams {
    pub channel: libc::c_int,
    pub fail_mask: libc::c_uint,
    pub reserved: [u8; 32],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelSetup {
    pub channel: libc::c_int,
    pub running_area: ChannelArea,
    pub stopped_area: ChannelArea,
    pub reserved: [u8; 32],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmStatus {
    pub state: libc::c_int,
    pub trigger_tstamp: Timespec,
    pub tstamp: Timespec,
    pub appl_ptr: libc::c_ulong,
    pub hw_ptr: libc::c_ulong,
    pub delay: libc::c_long,
    pub avail: libc::c_ulong,
    pub avail_max: libc::c_ulong,
    pub overrange: libc::c_ulong,
    pub reserved: [u8; 32],
}

#[repr(C)]
#[derive(Debug)]
pub struct MmapStatus {
    pub state: libc::c_int,
    pub hw_ptr: libc::c_ulong,
    pub tstamp: Timespec,
}

impl Default for MmapStatus {
    fn default() -> Self {
        Self {
            state: STATE_OPEN,
            hw_ptr: 0,
            tstamp: Timespec::default(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct MmapControl {
    pub appl_ptr: libc::c_ulong,
    pub avail_min: libc::c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct XferI {
    pub result: libc::c_long,
    pub buf: *mut libc::c_void,
    pub frames: libc::c_ulong,
}

#[repr(C)]
#[derive(Debug)]
pub struct XferN {
    pub result: libc::c_long,
    pub bufs: *mut *mut libc::c_void,
    pub frames: libc::c_ulong,
}

const PCM_IOCTL_MAGIC: u8 = b'A';
const PCM_IOCTL_PVERSION: u8 = 0x00;
const PCM_IOCTL_INFO: u8 = 0x01;
const PCM_IOCTL_PARAMS_INFO: u8 = 0x10;
const PCM_IOCTL_PARAMS: u8 = 0x11;
const PCM_IOCTL_SETUP: u8 = 0x12;
const PCM_IOCTL_STATUS: u8 = 0x20;
const PCM_IOCTL_DELAY: u8 = 0x21;
const PCM_IOCTL_CHANNEL_INFO: u8 = 0x32;
const PCM_IOCTL_CHANNEL_PARAMS: u8 = 0x33;
const PCM_IOCTL_CHANNEL_SETUP: u8 = 0x34;
const PCM_IOCTL_PREPARE: u8 = 0x40;
const PCM_IOCTL_START: u8 = 0x42;
const PCM_IOCTL_DROP: u8 = 0x43;
const PCM_IOCTL_DRAIN: u8 = 0x44;
const PCM_IOCTL_PAUSE: u8 = 0x45;
const PCM_IOCTL_WRITEI_FRAMES: u8 = 0x50;
const PCM_IOCTL_READI_FRAMES: u8 = 0x51;
const PCM_IOCTL_WRITEN_FRAMES: u8 = 0x52;
const PCM_IOCTL_READN_FRAMES: u8 = 0x53;

nix::ioctl_read!(pcm_pversion, PCM_IOCTL_MAGIC, PCM_IOCTL_PVERSION, libc::c_int);
nix::ioctl_read!(pcm_info, PCM_IOCTL_MAGIC, PCM_IOCTL_INFO, PcmInfo);
nix::ioctl_readwrite!(
    pcm_params_info,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_PARAMS_INFO,
    ParamsInfo
);
nix::ioctl_readwrite!(pcm_params, PCM_IOCTL_MAGIC, PCM_IOCTL_PARAMS, PcmParams);
nix::ioctl_read!(pcm_setup, PCM_IOCTL_MAGIC, PCM_IOCTL_SETUP, PcmSetup);
nix::ioctl_read!(pcm_status, PCM_IOCTL_MAGIC, PCM_IOCTL_STATUS, PcmStatus);
nix::ioctl_read!(pcm_delay, PCM_IOCTL_MAGIC, PCM_IOCTL_DELAY, libc::c_long);
nix::ioctl_readwrite!(
    pcm_channel_info,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_CHANNEL_INFO,
    ChannelInfo
);
nix::ioctl_readwrite!(
    pcm_channel_params,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_CHANNEL_PARAMS,
    ChannelParams
);
nix::ioctl_readwrite!(
    pcm_channel_setup,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_CHANNEL_SETUP,
    ChannelSetup
);
nix::ioctl_none!(pcm_prepare, PCM_IOCTL_MAGIC, PCM_IOCTL_PREPARE);
nix::ioctl_none!(pcm_start, PCM_IOCTL_MAGIC, PCM_IOCTL_START);
nix::ioctl_none!(pcm_drop, PCM_IOCTL_MAGIC, PCM_IOCTL_DROP);
nix::ioctl_none!(pcm_drain, PCM_IOCTL_MAGIC, PCM_IOCTL_DRAIN);
nix::ioctl_write_int!(pcm_pause, PCM_IOCTL_MAGIC, PCM_IOCTL_PAUSE);
nix::ioctl_write_ptr!(
    pcm_writei_frames,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_WRITEI_FRAMES,
    XferI
);
nix::ioctl_read!(
    pcm_readi_frames,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_READI_FRAMES,
    XferI
);
nix::ioctl_write_ptr!(
    pcm_writen_frames,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_WRITEN_FRAMES,
    XferN
);
nix::ioctl_read!(
    pcm_readn_frames,
    PCM_IOCTL_MAGIC,
    PCM_IOCTL_READN_FRAMES,
    XferN
);
