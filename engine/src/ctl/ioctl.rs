use crate::pcm::format::{cstr_fixed, fill_cstr};
use crate::pcm::ioctl::{PcmInfo, protocol_version};
use nix::libc;
use std::marker::PhantomData;

pub const CTL_VERSION_MAX: i32 = protocol_version(2, 0, 0);

pub const EVENT_REBUILD: u32 = 0;
pub const EVENT_VALUE: u32 = 1;
pub const EVENT_CHANGE: u32 = 2;
pub const EVENT_ADD: u32 = 3;
pub const EVENT_REMOVE: u32 = 4;

pub const ELEM_IFACE_CARD: i32 = 0;
pub const ELEM_IFACE_HWDEP: i32 = 1;
pub const ELEM_IFACE_MIXER: i32 = 2;
pub const ELEM_IFACE_PCM: i32 = 3;
pub const ELEM_IFACE_RAWMIDI: i32 = 4;

pub const ELEM_TYPE_NONE: i32 = 0;
pub const ELEM_TYPE_BOOLEAN: i32 = 1;
pub const ELEM_TYPE_INTEGER: i32 = 2;
pub const ELEM_TYPE_ENUMERATED: i32 = 3;
pub const ELEM_TYPE_BYTES: i32 = 4;

pub const ELEM_ACCESS_READ: u32 = 1 << 0;
pub const ELEM_ACCESS_WRITE: u32 = 1 << 1;
pub const ELEM_ACCESS_VOLATILE: u32 = 1 << 2;

pub const ELEM_NAME_LEN: usize = 44;
pub const ELEM_VALUE_COUNT: usize = 128;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawElemId {
    pub numid: libc::c_uint,
    pub iface: libc::c_int,
    pub device: libc::c_uint,
    pub subdevice: libc::c_uint,
    pub name: [u8; ELEM_NAME_LEN],
    pub index: libc::c_uint,
}

impl RawElemId {
    pub fn name(&self) -> String {
        cstr_fixed(&self.name)
    }

    pub fn set_name(&mut self, name: &str) {
        fill_cstr(&mut self.name, name);
    }
}

impl Default for RawElemId {
    fn default() -> Self {
        Self {
            numid: 0,
            iface: ELEM_IFACE_CARD,
            device: 0,
            subdevice: 0,
            name: [0; ELEM_NAME_LEN],
            index: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEvent {
    pub kind: libc::c_uint,
    pub id: RawElemId,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CardInfo {
    pub card: libc::c_int,
    pub kind: libc::c_int,
    pub id: [u8; 16],
    pub abbreviation: [u8; 16],
    pub name: [u8; 32],
    pub longname: [u8; 80],
    pub mixerid: [u8; 16],
    pub mixername: [u8; 80],
    pub pcmdevs: libc::c_uint,
    pub rawmididevs: libc::c_uint,
    pub hwdepdevs: libc::c_uint,
    pub reserved: [u8; 64],
}

impl CardInfo {
    pub fn new() -> Self {
        Self {
            card: 0,
            kind: 0,
            id: [0; 16],
            abbreviation: [0; 16],
            name: [0; 32],
            longname: [0; 80],
            mixerid: [0; 16],
            mixername: [0; 80],
            pcmdevs: 0,
            rawmididevs: 0,
            hwdepdevs: 0,
            reserved: [0; 64],
        }
    }

    pub fn id(&self) -> String {
        cstr_fixed(&self.id)
    }

    pub fn name(&self) -> String {
        cstr_fixed(&self.name)
    }

    pub fn longname(&self) -> String {
        cstr_fixed(&self.longname)
    }

    pub fn mixername(&self) -> String {
        cstr_fixed(&self.mixername)
    }

    pub fn set_id(&mut self, id: &str) {
        fill_cstr(&mut self.id, id);
    }

    pub fn set_name(&mut self, name: &str) {
        fill_cstr(&mut self.name, name);
    }
}

impl Default for CardInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Element list request. The identifier buffer can only be attached as a
/// borrowed slice, so `space` always matches what `pids` points at.
#[repr(C)]
#[derive(Debug)]
pub struct ElemList<'a> {
    pub offset: libc::c_uint,
    space: libc::c_uint,
    pub used: libc::c_uint,
    pub count: libc::c_uint,
    pids: *mut RawElemId,
    pub reserved: [u8; 50],
    ids: PhantomData<&'a mut [RawElemId]>,
}

impl ElemList<'static> {
    /// A list with no room for identifiers; fills in `count` only.
    pub fn new() -> Self {
        Self {
            offset: 0,
            space: 0,
            used: 0,
            count: 0,
            pids: std::ptr::null_mut(),
            reserved: [0; 50],
            ids: PhantomData,
        }
    }
}

impl<'a> ElemList<'a> {
    pub fn with_ids(ids: &'a mut [RawElemId]) -> Self {
        let space = libc::c_uint::try_from(ids.len()).unwrap_or(libc::c_uint::MAX);
        Self {
            offset: 0,
            space,
            used: 0,
            count: 0,
            pids: ids.as_mut_ptr(),
            reserved: [0; 50],
            ids: PhantomData,
        }
    }

    pub fn space(&self) -> usize {
        self.space as usize
    }

    /// Identifiers the transport reported, never more than were attached.
    pub fn ids(&self) -> &[RawElemId] {
        if self.pids.is_null() {
            return &[];
        }
        let used = self.used.min(self.space) as usize;
        unsafe { std::slice::from_raw_parts(self.pids, used) }
    }

    /// The whole attached buffer, for transports that fill it in place.
    pub fn ids_mut(&mut self) -> &mut [RawElemId] {
        if self.pids.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.pids, self.space as usize) }
    }
}

impl Default for ElemList<'static> {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ElemInfo {
    pub id: RawElemId,
    pub kind: libc::c_int,
    pub access: libc::c_uint,
    pub count: libc::c_uint,
    pub owner: libc::c_int,
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub reserved: [u8; 64],
}

impl ElemInfo {
    pub fn new(id: RawElemId) -> Self {
        Self {
            id,
            kind: ELEM_TYPE_NONE,
            access: 0,
            count: 0,
            owner: 0,
            min: 0,
            max: 0,
            step: 0,
            reserved: [0; 64],
        }
    }

    pub fn readable(&self) -> bool {
        (self.access & ELEM_ACCESS_READ) != 0
    }

    pub fn writable(&self) -> bool {
        (self.access & ELEM_ACCESS_WRITE) != 0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ElemValue {
    pub id: RawElemId,
    pub indirect: libc::c_uint,
    pub values: [i64; ELEM_VALUE_COUNT],
    pub reserved: [u8; 64],
}

impl ElemValue {
    pub fn new(id: RawElemId) -> Self {
        Self {
            id,
            indirect: 0,
            values: [0; ELEM_VALUE_COUNT],
            reserved: [0; 64],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HwdepInfo {
    pub device: libc::c_uint,
    pub card: libc::c_int,
    pub id: [u8; 64],
    pub name: [u8; 80],
    pub iface: libc::c_int,
    pub reserved: [u8; 64],
}

impl HwdepInfo {
    pub fn new(device: u32) -> Self {
        Self {
            device,
            card: 0,
            id: [0; 64],
            name: [0; 80],
            iface: 0,
            reserved: [0; 64],
        }
    }

    pub fn name(&self) -> String {
        cstr_fixed(&self.name)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawmidiInfo {
    pub device: libc::c_uint,
    pub subdevice: libc::c_uint,
    pub stream: libc::c_int,
    pub card: libc::c_int,
    pub flags: libc::c_uint,
    pub id: [u8; 64],
    pub name: [u8; 80],
    pub subname: [u8; 32],
    pub subdevices_count: libc::c_uint,
    pub subdevices_avail: libc::c_uint,
    pub reserved: [u8; 64],
}

impl RawmidiInfo {
    pub fn new(device: u32, subdevice: u32, stream: i32) -> Self {
        Self {
            device,
            subdevice,
            stream,
            card: 0,
            flags: 0,
            id: [0; 64],
            name: [0; 80],
            subname: [0; 32],
            subdevices_count: 0,
            subdevices_avail: 0,
            reserved: [0; 64],
        }
    }

    pub fn name(&self) -> String {
        cstr_fixed(&self.name)
    }
}

const CTL_IOCTL_MAGIC: u8 = b'U';
const CTL_IOCTL_PVERSION: u8 = 0x00;
const CTL_IOCTL_CARD_INFO: u8 = 0x01;
const CTL_IOCTL_ELEM_LIST: u8 = 0x10;
const CTL_IOCTL_ELEM_INFO: u8 = 0x11;
const CTL_IOCTL_ELEM_READ: u8 = 0x12;
const CTL_IOCTL_ELEM_WRITE: u8 = 0x13;
const CTL_IOCTL_HWDEP_INFO: u8 = 0x21;
const CTL_IOCTL_PCM_INFO: u8 = 0x31;
const CTL_IOCTL_PCM_PREFER_SUBDEVICE: u8 = 0x32;
const CTL_IOCTL_RAWMIDI_INFO: u8 = 0x41;
const CTL_IOCTL_RAWMIDI_PREFER_SUBDEVICE: u8 = 0x42;

nix::ioctl_read!(ctl_pversion, CTL_IOCTL_MAGIC, CTL_IOCTL_PVERSION, libc::c_int);
nix::ioctl_read!(ctl_card_info, CTL_IOCTL_MAGIC, CTL_IOCTL_CARD_INFO, CardInfo);
nix::ioctl_readwrite!(ctl_elem_list, CTL_IOCTL_MAGIC, CTL_IOCTL_ELEM_LIST, ElemList);
nix::ioctl_readwrite!(ctl_elem_info, CTL_IOCTL_MAGIC, CTL_IOCTL_ELEM_INFO, ElemInfo);
nix::ioctl_readwrite!(ctl_elem_read, CTL_IOCTL_MAGIC, CTL_IOCTL_ELEM_READ, ElemValue);
nix::ioctl_readwrite!(ctl_elem_write, CTL_IOCTL_MAGIC, CTL_IOCTL_ELEM_WRITE, ElemValue);
nix::ioctl_readwrite!(ctl_hwdep_info, CTL_IOCTL_MAGIC, CTL_IOCTL_HWDEP_INFO, HwdepInfo);
nix::ioctl_readwrite!(ctl_pcm_info, CTL_IOCTL_MAGIC, CTL_IOCTL_PCM_INFO, PcmInfo);
nix::ioctl_write_ptr!(
    ctl_pcm_prefer_subdevice,
    CTL_IOCTL_MAGIC,
    CTL_IOCTL_PCM_PREFER_SUBDEVICE,
    libc::c_int
);
nix::ioctl_readwrite!(
    ctl_rawmidi_info,
    CTL_IOCTL_MAGIC,
    CTL_IOCTL_RAWMIDI_INFO,
    RawmidiInfo
);
nix::ioctl_write_ptr!(
    ctl_rawmidi_prefer_subdevice,
    CTL_IOCTL_MAGIC,
    CTL_IOCTL_RAWMIDI_PREFER_SUBDEVICE,
    libc::c_int
);
