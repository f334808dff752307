//! The regions shared with the device manager.
//!
//! The status region is written by the kernel at any moment. Nothing here
//! caches it: every accessor performs a fresh volatile read, and
//! [`StatusRegion::snapshot`] re-reads the hardware position to make sure
//! the fields it returns belong to one update.

use super::PcmState;
use super::ioctl::{MmapControl, MmapStatus, Timespec};
use nix::libc;
use std::{
    ptr::{self, NonNull},
    sync::atomic::{Ordering, fence},
};

const SNAPSHOT_RETRIES: usize = 8;

#[derive(Debug)]
pub struct MappedRegion {
    ptr: NonNull<libc::c_void>,
    len: usize,
}

impl MappedRegion {
    /// # Safety
    /// `ptr` must point to `len` bytes that stay valid until the region is
    /// handed back to whoever created it.
    pub unsafe fn from_raw(ptr: *mut libc::c_void, len: usize) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, len })
    }

    pub fn as_ptr(&self) -> *mut libc::c_void {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

unsafe impl Send for MappedRegion {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: PcmState,
    pub hw_ptr: usize,
    pub tstamp: Timespec,
}

#[derive(Debug)]
pub struct StatusRegion {
    region: MappedRegion,
}

impl StatusRegion {
    /// Hands the region back when it is too small to hold the record.
    pub fn new(region: MappedRegion) -> Result<Self, MappedRegion> {
        if region.len() < std::mem::size_of::<MmapStatus>() {
            return Err(region);
        }
        Ok(Self { region })
    }

    fn raw(&self) -> *const MmapStatus {
        self.region.as_ptr() as *const MmapStatus
    }

    pub fn hw_ptr(&self) -> usize {
        let v = unsafe { ptr::read_volatile(ptr::addr_of!((*self.raw()).hw_ptr)) };
        fence(Ordering::Acquire);
        v as usize
    }

    pub fn state(&self) -> PcmState {
        let v = unsafe { ptr::read_volatile(ptr::addr_of!((*self.raw()).state)) };
        fence(Ordering::Acquire);
        PcmState::from_raw(v)
    }

    pub fn tstamp(&self) -> Timespec {
        let v = unsafe { ptr::read_volatile(ptr::addr_of!((*self.raw()).tstamp)) };
        fence(Ordering::Acquire);
        v
    }

    /// State, position and timestamp from a single kernel update. If the
    /// position moves while the fields are read the whole read is retried;
    /// after a bounded number of attempts the last read is returned.
    pub fn snapshot(&self) -> StatusSnapshot {
        let mut last = None;
        for _ in 0..SNAPSHOT_RETRIES {
            let before = self.hw_ptr();
            let state = self.state();
            let tstamp = self.tstamp();
            let after = self.hw_ptr();
            let snap = StatusSnapshot {
                state,
                hw_ptr: after,
                tstamp,
            };
            if before == after {
                return snap;
            }
            last = Some(snap);
        }
        last.unwrap_or(StatusSnapshot {
            state: self.state(),
            hw_ptr: self.hw_ptr(),
            tstamp: self.tstamp(),
        })
    }

    pub fn into_region(self) -> MappedRegion {
        self.region
    }
}

#[derive(Debug)]
pub struct ControlRegion {
    region: MappedRegion,
}

impl ControlRegion {
    pub fn new(region: MappedRegion) -> Result<Self, MappedRegion> {
        if region.len() < std::mem::size_of::<MmapControl>() {
            return Err(region);
        }
        Ok(Self { region })
    }

    fn raw(&self) -> *mut MmapControl {
        self.region.as_ptr() as *mut MmapControl
    }

    pub fn appl_ptr(&self) -> usize {
        let v = unsafe { ptr::read_volatile(ptr::addr_of!((*self.raw()).appl_ptr)) };
        fence(Ordering::Acquire);
        v as usize
    }

    pub fn set_appl_ptr(&mut self, pos: usize) {
        fence(Ordering::Release);
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.raw()).appl_ptr), pos as libc::c_ulong) };
    }

    pub fn avail_min(&self) -> usize {
        let v = unsafe { ptr::read_volatile(ptr::addr_of!((*self.raw()).avail_min)) };
        v as usize
    }

    pub fn set_avail_min(&mut self, frames: usize) {
        fence(Ordering::Release);
        unsafe {
            ptr::write_volatile(
                ptr::addr_of_mut!((*self.raw()).avail_min),
                frames as libc::c_ulong,
            )
        };
    }

    pub fn into_region(self) -> MappedRegion {
        self.region
    }
}

/// Backing store for the sample data of a mapped stream. Kernel shapes map
/// the device's data area; the unspecified shape keeps a private buffer that
/// is pushed to or pulled from the device with ordinary transfers.
#[derive(Debug)]
pub enum RingArea {
    User(Vec<u8>),
    Kernel(MappedRegion),
}

impl RingArea {
    pub fn len(&self) -> usize {
        match self {
            RingArea::User(buf) => buf.len(),
            RingArea::Kernel(region) => region.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_user(&self) -> bool {
        matches!(self, RingArea::User(_))
    }

    fn base(&mut self) -> *mut u8 {
        match self {
            RingArea::User(buf) => buf.as_mut_ptr(),
            RingArea::Kernel(region) => region.as_ptr() as *mut u8,
        }
    }

    pub fn user_bytes(&self) -> Option<&[u8]> {
        match self {
            RingArea::User(buf) => Some(buf),
            RingArea::Kernel(_) => None,
        }
    }

    pub fn user_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            RingArea::User(buf) => Some(buf),
            RingArea::Kernel(_) => None,
        }
    }

    /// Copies `dst.len()` bytes out of the ring starting at `offset`,
    /// wrapping at the end. Returns bytes copied.
    pub fn read_at(&mut self, dst: &mut [u8], offset: usize) -> usize {
        let total = self.len();
        map_read(self.base(), total, dst, offset, dst.len())
    }

    /// Copies `length` bytes into the ring starting at `offset`, wrapping at
    /// the end. `None` fills with zeroes.
    pub fn write_at(&mut self, src: Option<&[u8]>, offset: usize, length: usize) -> usize {
        let total = self.len();
        let length = src.map_or(length, |s| s.len().min(length));
        map_write(self.base(), total, src, offset, length)
    }
}

fn map_read(map: *mut u8, total: usize, dst: &mut [u8], mut offset: usize, mut length: usize) -> usize {
    if map.is_null() || length == 0 || total == 0 {
        return 0;
    }
    offset %= total;
    length = length.min(total).min(dst.len());
    let mut copied = 0;
    while length > 0 {
        let take = (total - offset).min(length);
        unsafe {
            ptr::copy_nonoverlapping(map.add(offset), dst[copied..].as_mut_ptr(), take);
        }
        copied += take;
        length -= take;
        offset = 0;
    }
    copied
}

fn map_write(
    map: *mut u8,
    total: usize,
    src: Option<&[u8]>,
    mut offset: usize,
    mut length: usize,
) -> usize {
    if map.is_null() || length == 0 || total == 0 {
        return 0;
    }
    offset %= total;
    length = length.min(total);
    let mut copied = 0;
    while length > 0 {
        let take = (total - offset).min(length);
        unsafe {
            if let Some(data) = src {
                ptr::copy_nonoverlapping(data[copied..].as_ptr(), map.add(offset), take);
            } else {
                ptr::write_bytes(map.add(offset), 0, take);
            }
        }
        copied += take;
        length -= take;
        offset = 0;
    }
    copied
}
