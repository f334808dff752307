use super::ioctl::*;
use super::mmap::MappedRegion;
use super::{AsyncNotify, OpenMode};
use crate::ctl::Ctl;
use crate::error::{Error, Result};
use nix::libc;
use std::{
    fs::File,
    os::{
        fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd},
        unix::fs::OpenOptionsExt,
    },
    ptr,
};

/// The request set of an open PCM device file.
///
/// Transfer calls return whatever count the device reported; the session
/// layer validates it against the request.
pub trait PcmDevice: Send {
    fn raw_fd(&self) -> RawFd;
    fn pversion(&self) -> Result<i32>;
    fn info(&self, info: &mut PcmInfo) -> Result<()>;
    fn params_info(&self, info: &mut ParamsInfo) -> Result<()>;
    fn params(&self, params: &mut PcmParams) -> Result<()>;
    fn setup(&self, setup: &mut PcmSetup) -> Result<()>;
    fn channel_info(&self, info: &mut ChannelInfo) -> Result<()>;
    fn channel_params(&self, params: &mut ChannelParams) -> Result<()>;
    fn channel_setup(&self, setup: &mut ChannelSetup) -> Result<()>;
    fn status(&self, status: &mut PcmStatus) -> Result<()>;
    fn delay(&self) -> Result<isize>;
    fn prepare(&self) -> Result<()>;
    fn start(&self) -> Result<()>;
    fn drop_frames(&self) -> Result<()>;
    fn drain(&self) -> Result<()>;
    fn pause(&self, enable: bool) -> Result<()>;

    /// Hands `frames` frames starting at `buf` to the device.
    ///
    /// # Safety
    /// The device reads `frames` whole frames of the committed setup from
    /// `buf`; it must be at least that long. See
    /// [`check_interleaved`](super::transfer::check_interleaved).
    unsafe fn writei(&self, buf: &[u8], frames: usize) -> Result<usize>;

    /// # Safety
    /// As [`PcmDevice::writei`], with the device writing into `buf`.
    unsafe fn readi(&self, buf: &mut [u8], frames: usize) -> Result<usize>;

    /// # Safety
    /// `bufs` must hold exactly one buffer per channel of the committed
    /// setup, each long enough for `frames` samples. See
    /// [`check_planes`](super::transfer::check_planes).
    unsafe fn writen(&self, bufs: &[&[u8]], frames: usize) -> Result<usize>;

    /// # Safety
    /// As [`PcmDevice::writen`], with the device writing into `bufs`.
    unsafe fn readn(&self, bufs: &mut [&mut [u8]], frames: usize) -> Result<usize>;

    fn set_nonblock(&self, nonblock: bool) -> Result<()>;
    fn set_async(&self, notify: Option<AsyncNotify>) -> Result<()>;
    fn map(&self, len: usize, offset: libc::off_t, writable: bool) -> Result<MappedRegion>;
    fn unmap(&self, region: MappedRegion) -> Result<()>;
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Where sessions get their device files and control channels from.
pub trait DeviceOpener {
    type Device: PcmDevice;

    fn open_ctl(&self, card: i32) -> Result<Ctl>;
    fn open_pcm(&self, path: &str, mode: OpenMode) -> Result<Self::Device>;
}

/// Device files under /dev/snd.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevFs;

impl DeviceOpener for DevFs {
    type Device = DevFile;

    fn open_ctl(&self, card: i32) -> Result<Ctl> {
        Ctl::open_hw(card)
    }

    fn open_pcm(&self, path: &str, mode: OpenMode) -> Result<DevFile> {
        let mut flags = 0;
        if mode.contains(OpenMode::NONBLOCK) {
            flags |= libc::O_NONBLOCK;
        }
        if mode.contains(OpenMode::ASYNC) {
            flags |= libc::O_ASYNC;
        }
        let file = File::options()
            .read(true)
            .write(true)
            .custom_flags(flags)
            .open(path)?;
        Ok(DevFile {
            fd: OwnedFd::from(file),
        })
    }
}

#[derive(Debug)]
pub struct DevFile {
    fd: OwnedFd,
}

impl DevFile {
    fn fd(&self) -> i32 {
        self.fd.as_raw_fd()
    }

    fn update_flags(&self, flag: libc::c_int, enable: bool) -> Result<()> {
        let fd = self.fd();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(Error::last_os_error());
        }
        let flags = if enable { flags | flag } else { flags & !flag };
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }
}

fn frames_result(result: libc::c_long) -> usize {
    result.max(0) as usize
}

impl PcmDevice for DevFile {
    fn raw_fd(&self) -> RawFd {
        self.fd()
    }

    fn pversion(&self) -> Result<i32> {
        let mut ver: libc::c_int = 0;
        unsafe { pcm_pversion(self.fd(), &mut ver) }?;
        Ok(ver)
    }

    fn info(&self, info: &mut PcmInfo) -> Result<()> {
        unsafe { pcm_info(self.fd(), info) }?;
        Ok(())
    }

    fn params_info(&self, info: &mut ParamsInfo) -> Result<()> {
        unsafe { pcm_params_info(self.fd(), info) }?;
        Ok(())
    }

    fn params(&self, params: &mut PcmParams) -> Result<()> {
        unsafe { pcm_params(self.fd(), params) }?;
        Ok(())
    }

    fn setup(&self, setup: &mut PcmSetup) -> Result<()> {
        unsafe { pcm_setup(self.fd(), setup) }?;
        Ok(())
    }

    fn channel_info(&self, info: &mut ChannelInfo) -> Result<()> {
        unsafe { pcm_channel_info(self.fd(), info) }?;
        Ok(())
    }

    fn channel_params(&self, params: &mut ChannelParams) -> Result<()> {
        unsafe { pcm_channel_params(self.fd(), params) }?;
        Ok(())
    }

    fn channel_setup(&self, setup: &mut ChannelSetup) -> Result<()> {
        unsafe { pcm_channel_setup(self.fd(), setup) }?;
        Ok(())
    }

    fn status(&self, status: &mut PcmStatus) -> Result<()> {
        unsafe { pcm_status(self.fd(), status) }?;
        Ok(())
    }

    fn delay(&self) -> Result<isize> {
        let mut delay: libc::c_long = 0;
        unsafe { pcm_delay(self.fd(), &mut delay) }?;
        Ok(delay as isize)
    }

    fn prepare(&self) -> Result<()> {
        unsafe { pcm_prepare(self.fd()) }?;
        Ok(())
    }

    fn start(&self) -> Result<()> {
        unsafe { pcm_start(self.fd()) }?;
        Ok(())
    }

    fn drop_frames(&self) -> Result<()> {
        unsafe { pcm_drop(self.fd()) }?;
        Ok(())
    }

    fn drain(&self) -> Result<()> {
        unsafe { pcm_drain(self.fd()) }?;
        Ok(())
    }

    fn pause(&self, enable: bool) -> Result<()> {
        unsafe { pcm_pause(self.fd(), enable as _) }?;
        Ok(())
    }

    unsafe fn writei(&self, buf: &[u8], frames: usize) -> Result<usize> {
        let mut xfer = XferI {
            result: 0,
            buf: buf.as_ptr() as *mut libc::c_void,
            frames: frames as libc::c_ulong,
        };
        unsafe { pcm_writei_frames(self.fd(), ptr::addr_of_mut!(xfer)) }?;
        Ok(frames_result(xfer.result))
    }

    unsafe fn readi(&self, buf: &mut [u8], frames: usize) -> Result<usize> {
        let mut xfer = XferI {
            result: 0,
            buf: buf.as_mut_ptr() as *mut libc::c_void,
            frames: frames as libc::c_ulong,
        };
        unsafe { pcm_readi_frames(self.fd(), &mut xfer) }?;
        Ok(frames_result(xfer.result))
    }

    unsafe fn writen(&self, bufs: &[&[u8]], frames: usize) -> Result<usize> {
        let mut ptrs: Vec<*mut libc::c_void> = bufs
            .iter()
            .map(|b| b.as_ptr() as *mut libc::c_void)
            .collect();
        let mut xfer = XferN {
            result: 0,
            bufs: ptrs.as_mut_ptr(),
            frames: frames as libc::c_ulong,
        };
        unsafe { pcm_writen_frames(self.fd(), ptr::addr_of_mut!(xfer)) }?;
        Ok(frames_result(xfer.result))
    }

    unsafe fn readn(&self, bufs: &mut [&mut [u8]], frames: usize) -> Result<usize> {
        let mut ptrs: Vec<*mut libc::c_void> = bufs
            .iter_mut()
            .map(|b| b.as_mut_ptr() as *mut libc::c_void)
            .collect();
        let mut xfer = XferN {
            result: 0,
            bufs: ptrs.as_mut_ptr(),
            frames: frames as libc::c_ulong,
        };
        unsafe { pcm_readn_frames(self.fd(), &mut xfer) }?;
        Ok(frames_result(xfer.result))
    }

    fn set_nonblock(&self, nonblock: bool) -> Result<()> {
        self.update_flags(libc::O_NONBLOCK, nonblock)
    }

    fn set_async(&self, notify: Option<AsyncNotify>) -> Result<()> {
        self.update_flags(libc::O_ASYNC, notify.is_some())?;
        let Some(notify) = notify else {
            return Ok(());
        };
        let fd = self.fd();
        #[cfg(target_os = "linux")]
        if unsafe { libc::fcntl(fd, F_SETSIG, notify.signal()) } < 0 {
            return Err(Error::last_os_error());
        }
        if unsafe { libc::fcntl(fd, libc::F_SETOWN, notify.pid()) } < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }

    fn map(&self, len: usize, offset: libc::off_t, writable: bool) -> Result<MappedRegion> {
        let prot = if writable {
            libc::PROT_READ | libc::PROT_WRITE
        } else {
            libc::PROT_READ
        };
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                prot,
                libc::MAP_FILE | libc::MAP_SHARED,
                self.fd(),
                offset,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(Error::last_os_error());
        }
        unsafe { MappedRegion::from_raw(addr, len) }.ok_or(Error::NoMemory)
    }

    fn unmap(&self, region: MappedRegion) -> Result<()> {
        if unsafe { libc::munmap(region.as_ptr(), region.len()) } < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }

    fn close(self) -> Result<()> {
        let fd = self.fd.into_raw_fd();
        if unsafe { libc::close(fd) } < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }
}
