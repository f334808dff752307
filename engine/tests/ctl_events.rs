use sndhw_engine::ctl::ioctl::{
    CardInfo, ELEM_IFACE_MIXER, EVENT_ADD, EVENT_REBUILD, EVENT_VALUE, ElemInfo, ElemList,
    ElemValue, HwdepInfo, RawElemId, RawEvent, RawmidiInfo,
};
use sndhw_engine::ctl::ops::CtlOps;
use sndhw_engine::pcm::ioctl::PcmInfo;
use sndhw_engine::{Ctl, CtlCallbacks, ElemId, Error, Result};
use std::{
    cell::RefCell,
    collections::VecDeque,
    os::fd::RawFd,
    sync::{Arc, Mutex},
};

enum Queued {
    Event(RawEvent),
    Short(usize),
    WouldBlock,
}

#[derive(Default)]
struct Log {
    reads: usize,
    lists: usize,
    cinfo_calls: usize,
    closed: bool,
}

struct QueueCtl {
    queue: VecDeque<Queued>,
    log: Arc<Mutex<Log>>,
    elements: u32,
    extra_used: u32,
}

fn event(kind: u32, numid: u32) -> Queued {
    Queued::Event(RawEvent {
        kind,
        id: ElemId::by_numid(numid).to_raw(),
    })
}

fn ctl_with(queue: Vec<Queued>) -> (Ctl, Arc<Mutex<Log>>) {
    card_with(queue, 0, 0)
}

/// `elements` mixer controls numbered from 1; `extra_used` inflates the
/// count the transport claims to have filled in.
fn card_with(queue: Vec<Queued>, elements: u32, extra_used: u32) -> (Ctl, Arc<Mutex<Log>>) {
    let log = Arc::new(Mutex::new(Log::default()));
    let backend = QueueCtl {
        queue: queue.into(),
        log: log.clone(),
        elements,
        extra_used,
    };
    (Ctl::from_backend("queue", Box::new(backend)), log)
}

impl CtlOps for QueueCtl {
    fn kind(&self) -> &'static str {
        "queue"
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }

    fn poll_descriptor(&self) -> RawFd {
        -1
    }

    fn hw_info(&self) -> Result<CardInfo> {
        let mut info = CardInfo::new();
        info.set_id("Queue");
        Ok(info)
    }

    fn clist(&mut self, list: &mut ElemList<'_>) -> Result<()> {
        self.log.lock().unwrap().lists += 1;
        list.count = self.elements;
        let ids = list.ids_mut();
        let filled = ids.len().min(self.elements as usize);
        for (i, id) in ids[..filled].iter_mut().enumerate() {
            id.numid = i as u32 + 1;
            id.iface = ELEM_IFACE_MIXER;
        }
        list.used = filled as u32 + self.extra_used;
        Ok(())
    }

    fn cinfo(&mut self, _info: &mut ElemInfo) -> Result<()> {
        self.log.lock().unwrap().cinfo_calls += 1;
        Ok(())
    }

    fn cread(&mut self, value: &mut ElemValue) -> Result<()> {
        value.values[0] = 42;
        Ok(())
    }

    fn cwrite(&mut self, _value: &mut ElemValue) -> Result<()> {
        Ok(())
    }

    fn hwdep_info(&mut self, _info: &mut HwdepInfo) -> Result<()> {
        Ok(())
    }

    fn pcm_info(&mut self, _info: &mut PcmInfo) -> Result<()> {
        Ok(())
    }

    fn pcm_prefer_subdevice(&mut self, _subdevice: i32) -> Result<()> {
        Ok(())
    }

    fn rawmidi_info(&mut self, _info: &mut RawmidiInfo) -> Result<()> {
        Ok(())
    }

    fn rawmidi_prefer_subdevice(&mut self, _subdevice: i32) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, ev: &mut RawEvent) -> Result<usize> {
        self.log.lock().unwrap().reads += 1;
        match self.queue.pop_front() {
            None => Ok(0),
            Some(Queued::Event(raw)) => {
                *ev = raw;
                Ok(std::mem::size_of::<RawEvent>())
            }
            Some(Queued::Short(n)) => Ok(n),
            Some(Queued::WouldBlock) => Err(Error::WouldBlock),
        }
    }
}

#[test]
fn handlers_only_see_their_kind_but_every_event_counts() {
    let (mut ctl, _log) = ctl_with(vec![
        event(EVENT_VALUE, 3),
        event(EVENT_ADD, 7),
        Queued::Event(RawEvent {
            kind: EVENT_REBUILD,
            ..RawEvent::default()
        }),
    ]);
    let seen = RefCell::new(Vec::new());
    let mut callbacks = CtlCallbacks {
        value: Some(Box::new(|id: &ElemId| seen.borrow_mut().push(id.numid))),
        ..CtlCallbacks::default()
    };
    assert_eq!(ctl.read(Some(&mut callbacks)).unwrap(), 3);
    drop(callbacks);
    assert_eq!(seen.into_inner(), vec![3]);
}

#[test]
fn unknown_kinds_are_counted_and_skipped() {
    let (mut ctl, _log) = ctl_with(vec![event(99, 1), event(EVENT_ADD, 2)]);
    let mut added = Vec::new();
    let mut callbacks = CtlCallbacks {
        add: Some(Box::new(|id: &ElemId| added.push(id.numid))),
        ..CtlCallbacks::default()
    };
    assert_eq!(ctl.read(Some(&mut callbacks)).unwrap(), 2);
    drop(callbacks);
    assert_eq!(added, vec![2]);
}

#[test]
fn no_handlers_still_drains_the_queue() {
    let (mut ctl, log) = ctl_with(vec![event(EVENT_VALUE, 1), event(EVENT_VALUE, 2)]);
    assert_eq!(ctl.read(None).unwrap(), 2);
    assert_eq!(ctl.read(None).unwrap(), 0);
    assert_eq!(log.lock().unwrap().reads, 4);
}

#[test]
fn short_record_ends_the_loop_with_an_error() {
    let (mut ctl, log) = ctl_with(vec![
        event(EVENT_VALUE, 1),
        Queued::Short(6),
        event(EVENT_VALUE, 2),
    ]);
    let mut calls = 0;
    let mut callbacks = CtlCallbacks {
        value: Some(Box::new(|_: &ElemId| calls += 1)),
        ..CtlCallbacks::default()
    };
    let err = ctl.read(Some(&mut callbacks)).unwrap_err();
    drop(callbacks);
    assert!(matches!(err, Error::ShortRecord { got: 6, .. }), "{err}");
    assert_eq!(err.errno(), -nix::libc::EIO);
    assert_eq!(calls, 1);
    assert_eq!(log.lock().unwrap().reads, 2);
}

#[test]
fn would_block_ends_the_loop_quietly() {
    let (mut ctl, _log) = ctl_with(vec![event(EVENT_VALUE, 1), Queued::WouldBlock]);
    assert_eq!(ctl.read(None).unwrap(), 1);
}

#[test]
fn element_requests_need_an_addressable_id() {
    let (mut ctl, log) = ctl_with(Vec::new());
    assert!(matches!(ctl.cinfo(&ElemId::default()), Err(Error::Invalid(_))));
    assert_eq!(log.lock().unwrap().cinfo_calls, 0);
    ctl.cinfo(&ElemId::by_name(ELEM_IFACE_MIXER, "Master Playback Volume"))
        .unwrap();
    assert_eq!(log.lock().unwrap().cinfo_calls, 1);
    let value = ctl.cread(&ElemId::by_numid(4)).unwrap();
    assert_eq!(value.values[0], 42);
    assert_eq!(ctl.hw_info().unwrap().id(), "Queue");
}

#[test]
fn close_and_drop_release_the_backend_once() {
    let (ctl, log) = ctl_with(Vec::new());
    ctl.close().unwrap();
    assert!(log.lock().unwrap().closed);

    let (ctl, log) = ctl_with(Vec::new());
    drop(ctl);
    assert!(log.lock().unwrap().closed);
}

#[test]
fn element_list_reports_every_id() {
    let (mut ctl, log) = card_with(Vec::new(), 3, 0);
    let ids = ctl.elements().unwrap();
    let numids: Vec<u32> = ids.iter().map(|id| id.numid).collect();
    assert_eq!(numids, [1, 2, 3]);
    assert!(ids.iter().all(|id| id.iface == ELEM_IFACE_MIXER));
    assert_eq!(log.lock().unwrap().lists, 2);
}

#[test]
fn element_list_ignores_counts_past_its_buffer() {
    let (mut ctl, _log) = card_with(Vec::new(), 2, 1000);
    assert_eq!(ctl.elements().unwrap().len(), 2);

    let mut raw = [RawElemId::default(); 2];
    let mut list = ElemList::with_ids(&mut raw);
    list.used = u32::MAX;
    assert_eq!(list.space(), 2);
    assert_eq!(list.ids().len(), 2);
}

#[test]
fn empty_card_lists_nothing() {
    let (mut ctl, log) = card_with(Vec::new(), 0, 0);
    assert!(ctl.elements().unwrap().is_empty());
    assert_eq!(log.lock().unwrap().lists, 1);

    let mut list = ElemList::new();
    list.used = 4;
    assert_eq!(list.space(), 0);
    assert!(list.ids().is_empty());
    assert!(list.ids_mut().is_empty());
}
