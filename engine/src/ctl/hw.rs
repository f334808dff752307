use super::ioctl::*;
use super::ops::CtlOps;
use crate::card::card_index;
use crate::config::ConfigNode;
use crate::error::{Error, Result};
use crate::pcm::ioctl::{PcmInfo, protocol_incompatible};
use nix::libc;
use std::{
    fs::File,
    os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd},
};
use tracing::debug;

pub fn ctl_device_path(card: i32) -> String {
    format!("/dev/snd/controlC{card}")
}

/// Control channel talking straight to the card's control device.
#[derive(Debug)]
pub struct HwCtl {
    fd: Option<OwnedFd>,
    card: i32,
}

impl HwCtl {
    pub fn open(card: i32) -> Result<Self> {
        let path = ctl_device_path(card);
        let file = File::options().read(true).write(true).open(&path)?;
        let ctl = Self {
            fd: Some(OwnedFd::from(file)),
            card,
        };
        let mut ver: libc::c_int = 0;
        unsafe { ctl_pversion(ctl.fd(), &mut ver) }?;
        if protocol_incompatible(ver, CTL_VERSION_MAX) {
            return Err(Error::IncompatibleVersion {
                found: ver,
                supported: CTL_VERSION_MAX,
            });
        }
        debug!("opened {path} (protocol {ver:#08x})");
        Ok(ctl)
    }

    pub fn card(&self) -> i32 {
        self.card
    }

    fn fd(&self) -> RawFd {
        self.fd.as_ref().map_or(-1, |fd| fd.as_raw_fd())
    }

    fn pending(&self) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
        if ready < 0 {
            return Err(Error::last_os_error());
        }
        Ok(ready > 0 && (pfd.revents & libc::POLLIN) != 0)
    }
}

impl CtlOps for HwCtl {
    fn kind(&self) -> &'static str {
        "hw"
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };
        if unsafe { libc::close(fd.into_raw_fd()) } < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }

    fn poll_descriptor(&self) -> RawFd {
        self.fd()
    }

    fn hw_info(&self) -> Result<CardInfo> {
        let mut info = CardInfo::new();
        unsafe { ctl_card_info(self.fd(), &mut info) }?;
        Ok(info)
    }

    fn clist(&mut self, list: &mut ElemList<'_>) -> Result<()> {
        unsafe { ctl_elem_list(self.fd(), list) }?;
        Ok(())
    }

    fn cinfo(&mut self, info: &mut ElemInfo) -> Result<()> {
        unsafe { ctl_elem_info(self.fd(), info) }?;
        Ok(())
    }

    fn cread(&mut self, value: &mut ElemValue) -> Result<()> {
        unsafe { ctl_elem_read(self.fd(), value) }?;
        Ok(())
    }

    fn cwrite(&mut self, value: &mut ElemValue) -> Result<()> {
        unsafe { ctl_elem_write(self.fd(), value) }?;
        Ok(())
    }

    fn hwdep_info(&mut self, info: &mut HwdepInfo) -> Result<()> {
        unsafe { ctl_hwdep_info(self.fd(), info) }?;
        Ok(())
    }

    fn pcm_info(&mut self, info: &mut PcmInfo) -> Result<()> {
        unsafe { ctl_pcm_info(self.fd(), info) }?;
        Ok(())
    }

    fn pcm_prefer_subdevice(&mut self, subdevice: i32) -> Result<()> {
        unsafe { ctl_pcm_prefer_subdevice(self.fd(), &subdevice) }?;
        Ok(())
    }

    fn rawmidi_info(&mut self, info: &mut RawmidiInfo) -> Result<()> {
        unsafe { ctl_rawmidi_info(self.fd(), info) }?;
        Ok(())
    }

    fn rawmidi_prefer_subdevice(&mut self, subdevice: i32) -> Result<()> {
        unsafe { ctl_rawmidi_prefer_subdevice(self.fd(), &subdevice) }?;
        Ok(())
    }

    fn read(&mut self, event: &mut RawEvent) -> Result<usize> {
        if !self.pending()? {
            return Ok(0);
        }
        let got = unsafe {
            libc::read(
                self.fd(),
                (event as *mut RawEvent).cast::<libc::c_void>(),
                std::mem::size_of::<RawEvent>(),
            )
        };
        if got < 0 {
            return Err(Error::last_os_error());
        }
        Ok(got as usize)
    }
}

/// `_snd_ctl_hw_open`: a `hw` control entry names its card with `card`.
pub fn open_from_config(name: &str, conf: &ConfigNode) -> Result<Box<dyn CtlOps>> {
    let mut card = None;
    for (key, node) in conf.entries() {
        match key {
            "comment" | "type" => {}
            "card" => {
                card = Some(match node {
                    ConfigNode::Integer(idx) if *idx < 0 => {
                        return Err(Error::invalid(format!(
                            "{name}: card {idx} is negative"
                        )));
                    }
                    ConfigNode::Integer(idx) => i32::try_from(*idx)
                        .map_err(|_| Error::invalid(format!("{name}: card {idx} out of range")))?,
                    ConfigNode::String(id) => card_index(id)?,
                    other => {
                        return Err(Error::invalid(format!(
                            "{name}: card must be an integer or a string, found {}",
                            other.type_name()
                        )));
                    }
                });
            }
            other => return Err(Error::invalid(format!("{name}: unknown field {other}"))),
        }
    }
    let card = card.ok_or_else(|| Error::invalid(format!("{name}: card is not defined")))?;
    Ok(Box::new(HwCtl::open(card)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_path_names_the_card() {
        assert_eq!(ctl_device_path(0), "/dev/snd/controlC0");
        assert_eq!(ctl_device_path(12), "/dev/snd/controlC12");
    }

    #[test]
    fn config_entry_needs_a_card() {
        let conf = ConfigNode::from_toml("type = \"hw\"\ncomment = \"x\"").unwrap();
        assert!(matches!(
            open_from_config("c", &conf),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn config_entry_rejects_unknown_keys() {
        let conf = ConfigNode::from_toml("type = \"hw\"\ncard = 0\nrate = 48000").unwrap();
        let err = open_from_config("c", &conf).err().unwrap();
        assert!(err.to_string().contains("rate"), "{err}");
    }

    #[test]
    fn config_entry_rejects_real_cards() {
        let conf = ConfigNode::from_toml("card = 1.5").unwrap();
        assert!(matches!(
            open_from_config("c", &conf),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn config_entry_rejects_negative_cards() {
        for text in ["card = -1", "card = -2147483649"] {
            let conf = ConfigNode::from_toml(text).unwrap();
            let err = open_from_config("c", &conf).err().unwrap();
            assert!(matches!(err, Error::Invalid(_)), "{text}");
            assert!(err.to_string().contains("negative"), "{err}");
        }
    }
}
