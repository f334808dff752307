use super::device::{DevFile, DevFs, DeviceOpener, PcmDevice};
use super::ioctl::*;
use super::mmap::{ControlRegion, MappedRegion, RingArea, StatusRegion};
use super::ops::{PcmBackend, PcmFastOps, PcmOps};
use super::transfer::{self, Ring};
use super::{AsyncNotify, OpenMode, PcmState, Stream};
use crate::card::card_index;
use crate::config::ConfigNode;
use crate::ctl::Ctl;
use crate::error::{Error, Result};
use nix::libc;
use std::{io, os::fd::RawFd};
use tracing::{debug, error};

/// Opens that land on the wrong subdevice before giving up with `Busy`.
pub const MAX_OPEN_ATTEMPTS: usize = 4;

pub fn pcm_device_path(card: i32, device: i32, stream: Stream) -> String {
    format!("/dev/snd/pcmC{card}D{device}{}", stream.suffix())
}

/// Card, device and optional subdevice of a hardware stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwAddress {
    pub card: i32,
    pub device: i32,
    pub subdevice: Option<i32>,
}

impl HwAddress {
    /// Reads a `hw` pcm entry: `card` (index or id), `device`, `subdevice`.
    pub fn from_config(name: &str, conf: &ConfigNode) -> Result<Self> {
        let mut card = None;
        let mut device = 0;
        let mut subdevice = None;
        for (key, node) in conf.entries() {
            match key {
                "comment" | "type" | "stream" => {}
                "card" => {
                    card = Some(match node {
                        ConfigNode::Integer(idx) if *idx < 0 => {
                            return Err(Error::invalid(format!(
                                "{name}: card {idx} is negative"
                            )));
                        }
                        ConfigNode::Integer(idx) => to_i32(name, "card", *idx)?,
                        ConfigNode::String(id) => card_index(id)?,
                        other => {
                            return Err(Error::invalid(format!(
                                "{name}: card must be an integer or a string, found {}",
                                other.type_name()
                            )));
                        }
                    });
                }
                "device" => device = to_i32(name, "device", node.integer_value("device")?)?,
                "subdevice" => {
                    let v = to_i32(name, "subdevice", node.integer_value("subdevice")?)?;
                    subdevice = (v >= 0).then_some(v);
                }
                other => return Err(Error::invalid(format!("{name}: unknown field {other}"))),
            }
        }
        let card = card.ok_or_else(|| Error::invalid(format!("{name}: card is not defined")))?;
        Ok(Self {
            card,
            device,
            subdevice,
        })
    }
}

fn to_i32(name: &str, what: &str, v: i64) -> Result<i32> {
    i32::try_from(v).map_err(|_| Error::invalid(format!("{name}: {what} {v} out of range")))
}

/// `_snd_pcm_hw_open`.
pub fn open_from_config(
    name: &str,
    conf: &ConfigNode,
    stream: Stream,
    mode: OpenMode,
) -> Result<Box<dyn PcmBackend>> {
    let addr = HwAddress::from_config(name, conf)?;
    let pcm = HwPcm::open_with(&DevFs, addr, stream, mode)?;
    Ok(Box::new(pcm))
}

fn check_count(op: &str, done: usize, requested: usize) -> Result<usize> {
    if done > requested {
        return Err(Error::Os(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{op} reported {done} frames for a request of {requested}"),
        )));
    }
    Ok(done)
}

/// Area of `channel` inside a ring laid out by this library: interleaved
/// frames, or one contiguous plane per channel.
pub fn user_area(setup: &PcmSetup, channel: u32) -> ChannelArea {
    let bits = setup.bytes_per_sample().unwrap_or(0) as u32 * 8;
    if setup.interleaved() {
        ChannelArea {
            addr: 0,
            first: channel * bits,
            step: setup.channels * bits,
        }
    } else {
        ChannelArea {
            addr: (channel as usize * setup.buffer_frames() * (bits as usize / 8)) as libc::c_ulong,
            first: 0,
            step: bits,
        }
    }
}

/// A stream on a `/dev/snd/pcmC*D*` device file with its status and control
/// records mapped.
#[derive(Debug)]
pub struct HwPcm<D: PcmDevice = DevFile> {
    dev: Option<D>,
    addr: HwAddress,
    stream: Stream,
    mode: OpenMode,
    status: Option<StatusRegion>,
    control: Option<ControlRegion>,
    ring_area: Option<RingArea>,
    setup: Option<PcmSetup>,
    user_mapped: bool,
}

impl HwPcm<DevFile> {
    pub fn open_device(card: i32, device: i32, stream: Stream, mode: OpenMode) -> Result<Self> {
        let addr = HwAddress {
            card,
            device,
            subdevice: None,
        };
        Self::open_with(&DevFs, addr, stream, mode)
    }
}

impl<D: PcmDevice> HwPcm<D> {
    /// Opens the device file, retrying while the driver hands out a
    /// subdevice other than the one asked for. The card's control channel
    /// is only used for the subdevice hint and is closed before returning.
    pub fn open_with<O>(opener: &O, addr: HwAddress, stream: Stream, mode: OpenMode) -> Result<Self>
    where
        O: DeviceOpener<Device = D>,
    {
        let mut ctl = opener.open_ctl(addr.card)?;
        let result = Self::negotiate(opener, &mut ctl, addr, stream, mode);
        if let Err(e) = ctl.close() {
            error!("card {}: failed to close control: {e}", addr.card);
        }
        result
    }

    fn negotiate<O>(
        opener: &O,
        ctl: &mut Ctl,
        addr: HwAddress,
        stream: Stream,
        mode: OpenMode,
    ) -> Result<Self>
    where
        O: DeviceOpener<Device = D>,
    {
        let path = pcm_device_path(addr.card, addr.device, stream);
        for attempt in 1..=MAX_OPEN_ATTEMPTS {
            ctl.pcm_prefer_subdevice(addr.subdevice.unwrap_or(-1))?;
            let dev = opener.open_pcm(&path, mode)?;
            let ver = match dev.pversion() {
                Ok(ver) => ver,
                Err(e) => {
                    close_quietly(dev, &path);
                    return Err(e);
                }
            };
            if protocol_incompatible(ver, PCM_VERSION_MAX) {
                close_quietly(dev, &path);
                return Err(Error::IncompatibleVersion {
                    found: ver,
                    supported: PCM_VERSION_MAX,
                });
            }
            if let Some(want) = addr.subdevice {
                let mut info = PcmInfo::new();
                if let Err(e) = dev.info(&mut info) {
                    close_quietly(dev, &path);
                    return Err(e);
                }
                if info.subdevice != want {
                    debug!(
                        "{path}: got subdevice {}, want {want} (attempt {attempt})",
                        info.subdevice
                    );
                    close_quietly(dev, &path);
                    continue;
                }
            }
            let mut pcm = Self {
                dev: Some(dev),
                addr,
                stream,
                mode,
                status: None,
                control: None,
                ring_area: None,
                setup: None,
                user_mapped: false,
            };
            // dropping a half-mapped session releases what it holds
            pcm.map_records()?;
            debug!("{path}: opened (protocol {ver:#08x})");
            return Ok(pcm);
        }
        Err(Error::Busy)
    }

    fn map_records(&mut self) -> Result<()> {
        let dev = self.dev.as_ref().ok_or_else(closed)?;
        let region = dev.map(
            std::mem::size_of::<MmapStatus>(),
            MMAP_OFFSET_STATUS,
            false,
        )?;
        let status = StatusRegion::new(region)
            .map_err(|region| short_region(dev, region, std::mem::size_of::<MmapStatus>()))?;
        self.status = Some(status);
        let region = dev.map(
            std::mem::size_of::<MmapControl>(),
            MMAP_OFFSET_CONTROL,
            true,
        )?;
        let control = ControlRegion::new(region)
            .map_err(|region| short_region(dev, region, std::mem::size_of::<MmapControl>()))?;
        self.control = Some(control);
        Ok(())
    }

    pub fn address(&self) -> HwAddress {
        self.addr
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_user_mapped(&self) -> bool {
        self.user_mapped
    }

    fn dev(&self) -> Result<&D> {
        self.dev.as_ref().ok_or_else(closed)
    }

    fn ring(&self) -> Result<(PcmSetup, Ring)> {
        let setup = self.setup.ok_or_else(no_setup)?;
        Ok((setup, Ring::new(setup.buffer_frames(), setup.boundary_frames())))
    }

    fn set_appl(&mut self, pos: usize) -> Result<()> {
        let control = self.control.as_mut().ok_or_else(closed)?;
        control.set_appl_ptr(pos);
        Ok(())
    }

    /// Unmaps every region and closes the device file. Each step runs even
    /// if an earlier one failed; the first failure is returned.
    fn release(&mut self) -> Result<()> {
        let Some(dev) = self.dev.take() else {
            return Ok(());
        };
        let path = pcm_device_path(self.addr.card, self.addr.device, self.stream);
        let mut first = None;
        if let Some(RingArea::Kernel(region)) = self.ring_area.take() {
            note(&mut first, &path, "unmap data area", dev.unmap(region));
        }
        if let Some(status) = self.status.take() {
            note(&mut first, &path, "unmap status", dev.unmap(status.into_region()));
        }
        if let Some(control) = self.control.take() {
            note(&mut first, &path, "unmap control", dev.unmap(control.into_region()));
        }
        note(&mut first, &path, "close", dev.close());
        first.map_or(Ok(()), Err)
    }

    /// Pulls `frames` captured frames from the device into the private
    /// ring. The device moves the application position as it goes.
    fn read_mmap(&mut self, frames: usize) -> Result<usize> {
        let (setup, ring) = self.ring()?;
        let bps = setup.bytes_per_sample().ok_or_else(bad_format)?;
        let bpf = setup.bytes_per_frame().ok_or_else(bad_format)?;
        let plane = setup.buffer_frames() * bps;
        let channels = setup.channels as usize;
        let mut done = 0;
        while done < frames {
            let appl = self.control.as_ref().ok_or_else(closed)?.appl_ptr();
            let offset = ring.ring_offset(appl);
            let chunk = ring.contiguous(appl, frames - done);
            let dev = self.dev.as_ref().ok_or_else(closed)?;
            let Some(buf) = self.ring_area.as_mut().and_then(|r| r.user_bytes_mut()) else {
                return Err(Error::invalid("ring is not mapped"));
            };
            // SAFETY: every slice is cut to exactly `chunk` frames, and the
            // plane count is checked against the channel count.
            let res = if setup.interleaved() {
                unsafe { dev.readi(&mut buf[offset * bpf..(offset + chunk) * bpf], chunk) }
            } else {
                let mut bufs: Vec<&mut [u8]> = buf
                    .chunks_mut(plane)
                    .take(channels)
                    .map(|p| &mut p[offset * bps..(offset + chunk) * bps])
                    .collect();
                let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
                transfer::check_planes(&setup, &lens, chunk)
                    .and_then(|()| unsafe { dev.readn(&mut bufs, chunk) })
            };
            let n = match res.and_then(|n| check_count("read", n, chunk)) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if done == 0 => return Err(e),
                Err(_) => break,
            };
            done += n;
        }
        Ok(done)
    }

    /// Pushes `frames` frames sitting in the private ring to the device.
    fn write_mmap(&mut self, frames: usize) -> Result<usize> {
        let (setup, ring) = self.ring()?;
        let bps = setup.bytes_per_sample().ok_or_else(bad_format)?;
        let bpf = setup.bytes_per_frame().ok_or_else(bad_format)?;
        let plane = setup.buffer_frames() * bps;
        let channels = setup.channels as usize;
        let mut done = 0;
        while done < frames {
            let appl = self.control.as_ref().ok_or_else(closed)?.appl_ptr();
            let offset = ring.ring_offset(appl);
            let chunk = ring.contiguous(appl, frames - done);
            let dev = self.dev.as_ref().ok_or_else(closed)?;
            let Some(buf) = self.ring_area.as_ref().and_then(|r| r.user_bytes()) else {
                return Err(Error::invalid("ring is not mapped"));
            };
            // SAFETY: as in `read_mmap`.
            let res = if setup.interleaved() {
                unsafe { dev.writei(&buf[offset * bpf..(offset + chunk) * bpf], chunk) }
            } else {
                let bufs: Vec<&[u8]> = buf
                    .chunks(plane)
                    .take(channels)
                    .map(|p| &p[offset * bps..(offset + chunk) * bps])
                    .collect();
                let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
                transfer::check_planes(&setup, &lens, chunk)
                    .and_then(|()| unsafe { dev.writen(&bufs, chunk) })
            };
            let n = match res.and_then(|n| check_count("write", n, chunk)) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if done == 0 => return Err(e),
                Err(_) => break,
            };
            done += n;
        }
        Ok(done)
    }
}

impl<D: PcmDevice> Drop for HwPcm<D> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

fn closed() -> Error {
    Error::BadState {
        op: "access",
        state: PcmState::Closed.name().to_string(),
    }
}

fn no_setup() -> Error {
    Error::invalid("stream has no setup")
}

fn bad_format() -> Error {
    Error::invalid("setup has an unknown sample format")
}

fn note(first: &mut Option<Error>, path: &str, what: &str, res: Result<()>) {
    if let Err(e) = res {
        error!("{path}: failed to {what}: {e}");
        first.get_or_insert(e);
    }
}

fn close_quietly<D: PcmDevice>(dev: D, path: &str) {
    if let Err(e) = dev.close() {
        debug!("{path}: close failed: {e}");
    }
}

fn short_region<D: PcmDevice>(dev: &D, region: MappedRegion, expected: usize) -> Error {
    let got = region.len();
    if let Err(e) = dev.unmap(region) {
        error!("failed to unmap short region: {e}");
    }
    Error::ShortRecord { expected, got }
}

impl<D: PcmDevice> PcmOps for HwPcm<D> {
    fn kind(&self) -> &'static str {
        "hw"
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.release()
    }

    fn poll_descriptor(&self) -> RawFd {
        self.dev.as_ref().map_or(-1, |d| d.raw_fd())
    }

    fn info(&self) -> Result<PcmInfo> {
        let mut info = PcmInfo::new();
        self.dev()?.info(&mut info)?;
        Ok(info)
    }

    fn params_info(&self, info: &mut ParamsInfo) -> Result<()> {
        self.dev()?.params_info(info)
    }

    fn params(&mut self, params: &mut PcmParams) -> Result<()> {
        self.setup = None;
        self.dev()?.params(params)
    }

    fn setup(&mut self) -> Result<PcmSetup> {
        let mut setup = PcmSetup::default();
        self.dev()?.setup(&mut setup)?;
        self.user_mapped = setup.mmap_shape == MMAP_UNSPECIFIED;
        if self.user_mapped {
            setup.mmap_shape = if setup.xfer_mode == XFER_INTERLEAVED {
                MMAP_INTERLEAVED
            } else {
                MMAP_NONINTERLEAVED
            };
        }
        if setup.boundary == 0 {
            setup.boundary = setup.boundary_frames() as libc::c_ulong;
        }
        self.setup = Some(setup);
        Ok(setup)
    }

    fn channel_info(&self, info: &mut ChannelInfo) -> Result<()> {
        self.dev()?.channel_info(info)
    }

    fn channel_params(&mut self, params: &mut ChannelParams) -> Result<()> {
        self.dev()?.channel_params(params)
    }

    fn channel_setup(&self, setup: &mut ChannelSetup) -> Result<()> {
        let pcm_setup = self.setup.ok_or_else(no_setup)?;
        let channel = u32::try_from(setup.channel)
            .ok()
            .filter(|c| *c < pcm_setup.channels)
            .ok_or_else(|| Error::invalid(format!("no channel {}", setup.channel)))?;
        if self.user_mapped {
            let area = user_area(&pcm_setup, channel);
            setup.running_area = area;
            setup.stopped_area = area;
            return Ok(());
        }
        self.dev()?.channel_setup(setup)
    }

    fn nonblock(&mut self, nonblock: bool) -> Result<()> {
        self.dev()?.set_nonblock(nonblock)?;
        self.mode = if nonblock {
            self.mode | OpenMode::NONBLOCK
        } else {
            self.mode.without(OpenMode::NONBLOCK)
        };
        Ok(())
    }

    fn set_async(&mut self, notify: Option<AsyncNotify>) -> Result<()> {
        let enable = notify.is_some();
        self.dev()?.set_async(notify)?;
        self.mode = if enable {
            self.mode | OpenMode::ASYNC
        } else {
            self.mode.without(OpenMode::ASYNC)
        };
        Ok(())
    }

    fn mmap(&mut self) -> Result<()> {
        if self.ring_area.is_some() {
            return Ok(());
        }
        let setup = self.setup.ok_or_else(no_setup)?;
        let bpf = setup.bytes_per_frame().ok_or_else(bad_format)?;
        let bytes = setup.buffer_frames() * bpf;
        let area = if self.user_mapped {
            let mut buf = Vec::new();
            buf.try_reserve_exact(bytes).map_err(|_| Error::NoMemory)?;
            buf.resize(bytes, 0);
            RingArea::User(buf)
        } else {
            let len = match setup.mmap_bytes {
                0 => bytes,
                n => n as usize,
            };
            RingArea::Kernel(self.dev()?.map(len, MMAP_OFFSET_DATA, true)?)
        };
        debug!("mapped {} byte ring (user: {})", area.len(), area.is_user());
        self.ring_area = Some(area);
        Ok(())
    }

    fn munmap(&mut self) -> Result<()> {
        match self.ring_area.take() {
            Some(RingArea::Kernel(region)) => self.dev()?.unmap(region),
            _ => Ok(()),
        }
    }

    fn ring_area(&mut self) -> Option<&mut RingArea> {
        self.ring_area.as_mut()
    }
}

impl<D: PcmDevice> PcmFastOps for HwPcm<D> {
    fn status(&self) -> Result<PcmStatus> {
        let mut status = PcmStatus::default();
        self.dev()?.status(&mut status)?;
        Ok(status)
    }

    fn state(&self) -> PcmState {
        self.status
            .as_ref()
            .map_or(PcmState::Closed, |s| s.snapshot().state)
    }

    fn delay(&self) -> Result<isize> {
        self.dev()?.delay()
    }

    fn prepare(&mut self) -> Result<()> {
        self.dev()?.prepare()
    }

    fn start(&mut self) -> Result<()> {
        self.dev()?.start()
    }

    fn drop_frames(&mut self) -> Result<()> {
        self.dev()?.drop_frames()
    }

    fn drain(&mut self) -> Result<()> {
        self.dev()?.drain()
    }

    fn pause(&mut self, enable: bool) -> Result<()> {
        self.dev()?.pause(enable)
    }

    fn rewind(&mut self, frames: usize) -> usize {
        let Ok((setup, ring)) = self.ring() else {
            return 0;
        };
        if setup.xrun_mode == XRUN_ASAP && self.delay().is_err() {
            return 0;
        }
        let appl = self.appl_ptr();
        let n = ring.rewindable(self.stream, self.hw_ptr(), appl, frames);
        if n > 0 && self.set_appl(ring.appl_backward(appl, n)).is_err() {
            return 0;
        }
        n
    }

    fn writei(&mut self, buf: &[u8], frames: usize) -> Result<usize> {
        let setup = self.setup.ok_or_else(no_setup)?;
        transfer::check_interleaved(&setup, buf.len(), frames)?;
        // SAFETY: `buf` holds `frames` frames of the committed setup.
        let n = unsafe { self.dev()?.writei(buf, frames) }?;
        check_count("writei", n, frames)
    }

    fn writen(&mut self, bufs: &[&[u8]], frames: usize) -> Result<usize> {
        let setup = self.setup.ok_or_else(no_setup)?;
        let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
        transfer::check_planes(&setup, &lens, frames)?;
        // SAFETY: one buffer per channel, each holding `frames` samples.
        let n = unsafe { self.dev()?.writen(bufs, frames) }?;
        check_count("writen", n, frames)
    }

    fn readi(&mut self, buf: &mut [u8], frames: usize) -> Result<usize> {
        let setup = self.setup.ok_or_else(no_setup)?;
        transfer::check_interleaved(&setup, buf.len(), frames)?;
        // SAFETY: `buf` holds `frames` frames of the committed setup.
        let n = unsafe { self.dev()?.readi(buf, frames) }?;
        check_count("readi", n, frames)
    }

    fn readn(&mut self, bufs: &mut [&mut [u8]], frames: usize) -> Result<usize> {
        let setup = self.setup.ok_or_else(no_setup)?;
        let lens: Vec<usize> = bufs.iter().map(|b| b.len()).collect();
        transfer::check_planes(&setup, &lens, frames)?;
        // SAFETY: one buffer per channel, each holding `frames` samples.
        let n = unsafe { self.dev()?.readn(bufs, frames) }?;
        check_count("readn", n, frames)
    }

    /// Capture streams without a kernel mmap shape move data here: any
    /// frames already captured are read into the private ring before the
    /// count is returned.
    fn avail_update(&mut self) -> Result<usize> {
        let (setup, ring) = self.ring()?;
        if setup.ready_mode == READY_ASAP || setup.xrun_mode == XRUN_ASAP {
            self.delay()?;
        }
        let avail = ring.checked_avail(self.stream, self.hw_ptr(), self.appl_ptr())?;
        let ring_is_user = self.ring_area.as_ref().is_some_and(|r| r.is_user());
        if self.stream == Stream::Capture && self.user_mapped && ring_is_user && avail > 0 {
            return self.read_mmap(avail);
        }
        Ok(avail)
    }

    fn mmap_forward(&mut self, frames: usize) -> Result<usize> {
        let ring_is_user = self.ring_area.as_ref().is_some_and(|r| r.is_user());
        if self.stream == Stream::Playback && self.user_mapped && ring_is_user {
            return self.write_mmap(frames);
        }
        let (_, ring) = self.ring()?;
        let appl = ring.appl_forward(self.appl_ptr(), frames);
        self.set_appl(appl)?;
        Ok(frames)
    }

    fn set_avail_min(&mut self, frames: usize) -> Result<()> {
        self.control
            .as_mut()
            .ok_or_else(closed)?
            .set_avail_min(frames);
        Ok(())
    }

    fn appl_ptr(&self) -> usize {
        self.control.as_ref().map_or(0, |c| c.appl_ptr())
    }

    fn hw_ptr(&self) -> usize {
        self.status.as_ref().map_or(0, |s| s.hw_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_paths_encode_direction() {
        assert_eq!(
            pcm_device_path(0, 3, Stream::Playback),
            "/dev/snd/pcmC0D3p"
        );
        assert_eq!(pcm_device_path(1, 0, Stream::Capture), "/dev/snd/pcmC1D0c");
    }

    #[test]
    fn config_entry_fields() {
        let conf = ConfigNode::from_toml(
            "type = \"hw\"\nstream = \"playback\"\ncard = 2\ndevice = 1\nsubdevice = -1",
        )
        .unwrap();
        let addr = HwAddress::from_config("out", &conf).unwrap();
        assert_eq!(
            addr,
            HwAddress {
                card: 2,
                device: 1,
                subdevice: None
            }
        );
    }

    #[test]
    fn config_entry_errors_are_invalid() {
        for text in [
            "device = 0",
            "card = 0\nrate = 44100",
            "card = 0\ndevice = \"one\"",
            "card = 0.5",
            "card = -1",
            "card = -4294967296",
        ] {
            let conf = ConfigNode::from_toml(text).unwrap();
            assert!(
                matches!(HwAddress::from_config("x", &conf), Err(Error::Invalid(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn oversized_transfer_counts_are_io_errors() {
        let err = check_count("writei", 9, 8).unwrap_err();
        assert_eq!(err.errno(), -libc::EIO);
        assert_eq!(check_count("writei", 8, 8).unwrap(), 8);
    }

    #[test]
    fn user_areas_follow_the_ring_layout() {
        let setup = PcmSetup {
            format: super::super::format::FORMAT_S16_LE,
            channels: 2,
            buffer_size: 64,
            xfer_mode: XFER_INTERLEAVED,
            ..PcmSetup::default()
        };
        assert_eq!(
            user_area(&setup, 1),
            ChannelArea {
                addr: 0,
                first: 16,
                step: 32
            }
        );
        let planar = PcmSetup {
            xfer_mode: XFER_NONINTERLEAVED,
            ..setup
        };
        assert_eq!(
            user_area(&planar, 1),
            ChannelArea {
                addr: 128,
                first: 0,
                step: 16
            }
        );
    }
}
