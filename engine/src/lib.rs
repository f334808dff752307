pub mod card;
pub mod config;
pub mod ctl;
pub mod error;
pub mod pcm;
pub mod resolver;

pub use ctl::{Ctl, CtlCallbacks, CtlEvent, ElemId};
pub use error::{Error, Result};
pub use pcm::{AsyncNotify, OpenMode, Pcm, PcmState, Stream};
