use super::Stream;
use super::ioctl::{
    STATE_CLOSED, STATE_DRAINING, STATE_OPEN, STATE_PAUSED, STATE_PREPARED, STATE_RUNNING,
    STATE_SETUP, STATE_XRUN,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcmState {
    Open,
    Setup,
    Prepared,
    Running,
    Xrun,
    Draining,
    Paused,
    Closed,
}

impl PcmState {
    /// Anything the kernel reports that we do not know is treated as a
    /// stream that went away.
    pub fn from_raw(v: i32) -> Self {
        match v {
            STATE_OPEN => PcmState::Open,
            STATE_SETUP => PcmState::Setup,
            STATE_PREPARED => PcmState::Prepared,
            STATE_RUNNING => PcmState::Running,
            STATE_XRUN => PcmState::Xrun,
            STATE_DRAINING => PcmState::Draining,
            STATE_PAUSED => PcmState::Paused,
            _ => PcmState::Closed,
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            PcmState::Open => STATE_OPEN,
            PcmState::Setup => STATE_SETUP,
            PcmState::Prepared => STATE_PREPARED,
            PcmState::Running => STATE_RUNNING,
            PcmState::Xrun => STATE_XRUN,
            PcmState::Draining => STATE_DRAINING,
            PcmState::Paused => STATE_PAUSED,
            PcmState::Closed => STATE_CLOSED,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PcmState::Open => "open",
            PcmState::Setup => "setup",
            PcmState::Prepared => "prepared",
            PcmState::Running => "running",
            PcmState::Xrun => "xrun",
            PcmState::Draining => "draining",
            PcmState::Paused => "paused",
            PcmState::Closed => "closed",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            PcmState::Setup
                | PcmState::Prepared
                | PcmState::Running
                | PcmState::Xrun
                | PcmState::Draining
                | PcmState::Paused
        )
    }

    fn bad(self, op: &'static str) -> Error {
        Error::BadState {
            op,
            state: self.name().to_string(),
        }
    }

    pub fn check_prepare(self) -> Result<()> {
        match self {
            PcmState::Open | PcmState::Setup | PcmState::Prepared | PcmState::Xrun => Ok(()),
            _ => Err(self.bad("prepare")),
        }
    }

    pub fn check_start(self) -> Result<()> {
        match self {
            PcmState::Prepared => Ok(()),
            _ => Err(self.bad("start")),
        }
    }

    pub fn check_drop(self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(self.bad("drop"))
        }
    }

    pub fn check_drain(self) -> Result<()> {
        match self {
            PcmState::Running => Ok(()),
            _ => Err(self.bad("drain")),
        }
    }

    pub fn check_pause(self, enable: bool) -> Result<()> {
        match (self, enable) {
            (PcmState::Running, true) | (PcmState::Paused, false) => Ok(()),
            _ => Err(self.bad(if enable { "pause" } else { "resume" })),
        }
    }

    /// Frames may move in prepared and running; capture may also empty
    /// the ring while draining.
    pub fn check_transfer(self, stream: Stream) -> Result<()> {
        match (self, stream) {
            (PcmState::Xrun, _) => Err(Error::Xrun),
            (PcmState::Prepared | PcmState::Running, _) => Ok(()),
            (PcmState::Draining, Stream::Capture) => Ok(()),
            _ => Err(self.bad("transfer")),
        }
    }
}

impl std::fmt::Display for PcmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
