pub mod hw;
pub mod ioctl;
pub mod ops;

use crate::config;
use crate::error::{Error, Result};
use crate::pcm::ioctl::PcmInfo;
use crate::resolver::Resolver;
use ioctl::{
    CardInfo, EVENT_ADD, EVENT_CHANGE, EVENT_REBUILD, EVENT_REMOVE, EVENT_VALUE, ElemInfo,
    ElemList, ElemValue, HwdepInfo, RawElemId, RawEvent, RawmidiInfo,
};
use ops::CtlOps;
use std::os::fd::RawFd;
use tracing::{debug, error};

/// Identifier of one control element. Lookups work by numid or by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElemId {
    pub numid: u32,
    pub iface: i32,
    pub device: u32,
    pub subdevice: u32,
    pub name: String,
    pub index: u32,
}

impl ElemId {
    pub fn by_numid(numid: u32) -> Self {
        Self {
            numid,
            ..Self::default()
        }
    }

    pub fn by_name(iface: i32, name: &str) -> Self {
        Self {
            iface,
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_addressable(&self) -> bool {
        self.numid != 0 || !self.name.is_empty()
    }

    pub fn to_raw(&self) -> RawElemId {
        let mut raw = RawElemId {
            numid: self.numid,
            iface: self.iface,
            device: self.device,
            subdevice: self.subdevice,
            index: self.index,
            ..RawElemId::default()
        };
        raw.set_name(&self.name);
        raw
    }
}

impl From<&RawElemId> for ElemId {
    fn from(raw: &RawElemId) -> Self {
        Self {
            numid: raw.numid,
            iface: raw.iface,
            device: raw.device,
            subdevice: raw.subdevice,
            name: raw.name(),
            index: raw.index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtlEvent {
    Rebuild,
    Value(ElemId),
    Change(ElemId),
    Add(ElemId),
    Remove(ElemId),
}

impl CtlEvent {
    /// `None` for kinds this library does not know.
    pub fn decode(raw: &RawEvent) -> Option<Self> {
        let id = || ElemId::from(&raw.id);
        match raw.kind {
            EVENT_REBUILD => Some(CtlEvent::Rebuild),
            EVENT_VALUE => Some(CtlEvent::Value(id())),
            EVENT_CHANGE => Some(CtlEvent::Change(id())),
            EVENT_ADD => Some(CtlEvent::Add(id())),
            EVENT_REMOVE => Some(CtlEvent::Remove(id())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CtlEvent::Rebuild => "rebuild",
            CtlEvent::Value(_) => "value",
            CtlEvent::Change(_) => "change",
            CtlEvent::Add(_) => "add",
            CtlEvent::Remove(_) => "remove",
        }
    }
}

type ElemHandler<'a> = Box<dyn FnMut(&ElemId) + 'a>;

/// Per-kind event handlers. Kinds without a handler are still counted.
#[derive(Default)]
pub struct CtlCallbacks<'a> {
    pub rebuild: Option<Box<dyn FnMut() + 'a>>,
    pub value: Option<ElemHandler<'a>>,
    pub change: Option<ElemHandler<'a>>,
    pub add: Option<ElemHandler<'a>>,
    pub remove: Option<ElemHandler<'a>>,
}

impl CtlCallbacks<'_> {
    fn dispatch(&mut self, event: &CtlEvent) {
        match event {
            CtlEvent::Rebuild => {
                if let Some(f) = self.rebuild.as_mut() {
                    f();
                }
            }
            CtlEvent::Value(id) => call(&mut self.value, id),
            CtlEvent::Change(id) => call(&mut self.change, id),
            CtlEvent::Add(id) => call(&mut self.add, id),
            CtlEvent::Remove(id) => call(&mut self.remove, id),
        }
    }
}

fn call(handler: &mut Option<ElemHandler<'_>>, id: &ElemId) {
    if let Some(f) = handler.as_mut() {
        f(id);
    }
}

/// An open control channel.
pub struct Ctl {
    name: String,
    backend: Option<Box<dyn CtlOps>>,
}

impl std::fmt::Debug for Ctl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ctl")
            .field("name", &self.name)
            .field("kind", &self.backend.as_ref().map(|b| b.kind()))
            .finish()
    }
}

impl Ctl {
    /// Opens the control channel `name` is configured as, or the hardware
    /// control of the card it names.
    pub fn open(name: &str) -> Result<Self> {
        let conf = config::update()?;
        Resolver::system().open_ctl(&conf, name)
    }

    pub fn open_hw(card: i32) -> Result<Self> {
        let backend = hw::HwCtl::open(card)?;
        Ok(Self::from_backend(format!("hw:{card}"), Box::new(backend)))
    }

    pub fn from_backend(name: impl Into<String>, backend: Box<dyn CtlOps>) -> Self {
        Self {
            name: name.into(),
            backend: Some(backend),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ops(&self) -> Result<&dyn CtlOps> {
        self.backend
            .as_deref()
            .ok_or_else(|| Error::invalid(format!("{}: control is closed", self.name)))
    }

    fn ops_mut(&mut self) -> Result<&mut (dyn CtlOps + 'static)> {
        let name = &self.name;
        self.backend
            .as_deref_mut()
            .ok_or_else(|| Error::invalid(format!("{name}: control is closed")))
    }

    pub fn kind(&self) -> &'static str {
        self.backend.as_ref().map_or("closed", |b| b.kind())
    }

    pub fn poll_descriptor(&self) -> Result<RawFd> {
        Ok(self.ops()?.poll_descriptor())
    }

    pub fn hw_info(&self) -> Result<CardInfo> {
        self.ops()?.hw_info()
    }

    pub fn clist(&mut self, list: &mut ElemList<'_>) -> Result<()> {
        self.ops_mut()?.clist(list)
    }

    /// Collects every element identifier the card exposes.
    pub fn elements(&mut self) -> Result<Vec<ElemId>> {
        let mut list = ElemList::new();
        self.clist(&mut list)?;
        let mut ids = vec![RawElemId::default(); list.count as usize];
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut list = ElemList::with_ids(&mut ids);
        self.clist(&mut list)?;
        Ok(list.ids().iter().map(ElemId::from).collect())
    }

    pub fn cinfo(&mut self, id: &ElemId) -> Result<ElemInfo> {
        check_id(id)?;
        let mut info = ElemInfo::new(id.to_raw());
        self.ops_mut()?.cinfo(&mut info)?;
        Ok(info)
    }

    pub fn cread(&mut self, id: &ElemId) -> Result<ElemValue> {
        check_id(id)?;
        let mut value = ElemValue::new(id.to_raw());
        self.ops_mut()?.cread(&mut value)?;
        Ok(value)
    }

    pub fn cwrite(&mut self, value: &mut ElemValue) -> Result<()> {
        check_id(&ElemId::from(&value.id))?;
        self.ops_mut()?.cwrite(value)
    }

    pub fn hwdep_info(&mut self, info: &mut HwdepInfo) -> Result<()> {
        self.ops_mut()?.hwdep_info(info)
    }

    pub fn pcm_info(&mut self, info: &mut PcmInfo) -> Result<()> {
        self.ops_mut()?.pcm_info(info)
    }

    pub fn pcm_prefer_subdevice(&mut self, subdevice: i32) -> Result<()> {
        self.ops_mut()?.pcm_prefer_subdevice(subdevice)
    }

    pub fn rawmidi_info(&mut self, info: &mut RawmidiInfo) -> Result<()> {
        self.ops_mut()?.rawmidi_info(info)
    }

    pub fn rawmidi_prefer_subdevice(&mut self, subdevice: i32) -> Result<()> {
        self.ops_mut()?.rawmidi_prefer_subdevice(subdevice)
    }

    /// Drains the pending events, handing each to the matching handler.
    /// Returns how many records were consumed, including kinds that have
    /// no handler or are unknown. A record of the wrong size ends the loop
    /// with an error.
    pub fn read(&mut self, mut callbacks: Option<&mut CtlCallbacks<'_>>) -> Result<usize> {
        let ops = self.ops_mut()?;
        let mut count = 0;
        loop {
            let mut raw = RawEvent::default();
            let got = match ops.read(&mut raw) {
                Ok(0) | Err(Error::WouldBlock) => break,
                Ok(n) => n,
                Err(e) => return Err(e),
            };
            if got != std::mem::size_of::<RawEvent>() {
                return Err(Error::ShortRecord {
                    expected: std::mem::size_of::<RawEvent>(),
                    got,
                });
            }
            count += 1;
            let Some(event) = CtlEvent::decode(&raw) else {
                debug!("skipping control event of unknown kind {}", raw.kind);
                continue;
            };
            if let Some(cb) = callbacks.as_deref_mut() {
                cb.dispatch(&event);
            }
        }
        Ok(count)
    }

    pub fn close(mut self) -> Result<()> {
        match self.backend.take() {
            Some(backend) => backend.close(),
            None => Ok(()),
        }
    }
}

impl Drop for Ctl {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.take()
            && let Err(e) = backend.close()
        {
            error!("{}: failed to close control: {e}", self.name);
        }
    }
}

fn check_id(id: &ElemId) -> Result<()> {
    if id.is_addressable() {
        Ok(())
    } else {
        Err(Error::invalid("element id needs a name or a numid"))
    }
}
