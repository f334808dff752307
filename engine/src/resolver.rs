//! Maps a logical device name to the backend that serves it.
//!
//! A name with an entry under `ctl` / `pcm` is opened through the entry
//! point its `type` registers under `ctltype` / `pcmtype`; anything else is
//! taken to name a card and opened on the hardware directly.

use crate::card::card_index;
use crate::config::ConfigNode;
use crate::ctl::{self, Ctl, ops::CtlOps};
use crate::error::{Error, Result};
use crate::pcm::{self, OpenMode, Pcm, Stream, ops::PcmBackend};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock},
};
use tracing::debug;

/// Module every built-in backend lives in.
pub const DEFAULT_MODULE: &str = "libsndhw.so";

pub const PCM_HW_OPEN: &str = "_snd_pcm_hw_open";
pub const CTL_HW_OPEN: &str = "_snd_ctl_hw_open";

pub type PcmOpenFn =
    fn(name: &str, conf: &ConfigNode, stream: Stream, mode: OpenMode) -> Result<Box<dyn PcmBackend>>;
pub type CtlOpenFn = fn(name: &str, conf: &ConfigNode) -> Result<Box<dyn CtlOps>>;

/// A loaded module that can be asked for backend entry points by name.
pub trait Module: Send + Sync {
    fn pcm_entry(&self, symbol: &str) -> Option<PcmOpenFn>;
    fn ctl_entry(&self, symbol: &str) -> Option<CtlOpenFn>;
}

pub trait ModuleLoader {
    /// Fails with [`Error::NoEntity`] when `path` cannot be loaded.
    fn load(&self, path: &str) -> Result<Arc<dyn Module>>;
}

/// The backends compiled into this library.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinModule;

impl Module for BuiltinModule {
    fn pcm_entry(&self, symbol: &str) -> Option<PcmOpenFn> {
        match symbol {
            PCM_HW_OPEN => Some(pcm::hw::open_from_config),
            _ => None,
        }
    }

    fn ctl_entry(&self, symbol: &str) -> Option<CtlOpenFn> {
        match symbol {
            CTL_HW_OPEN => Some(ctl::hw::open_from_config),
            _ => None,
        }
    }
}

/// A shared library exporting entry points with the `PcmOpenFn` /
/// `CtlOpenFn` signatures. It has to be built by the same compiler as
/// this crate.
struct DynamicModule {
    library: libloading::Library,
}

impl DynamicModule {
    fn symbol<T: Copy>(&self, symbol: &str) -> Option<T> {
        let mut name = symbol.as_bytes().to_vec();
        name.push(0);
        // SAFETY: the caller names the entry point type; libraries stay
        // loaded for the process lifetime so the copied pointer outlives
        // the symbol handle.
        unsafe { self.library.get::<T>(&name) }.ok().map(|s| *s)
    }
}

impl Module for DynamicModule {
    fn pcm_entry(&self, symbol: &str) -> Option<PcmOpenFn> {
        self.symbol::<PcmOpenFn>(symbol)
    }

    fn ctl_entry(&self, symbol: &str) -> Option<CtlOpenFn> {
        self.symbol::<CtlOpenFn>(symbol)
    }
}

/// Resolves [`DEFAULT_MODULE`] to the built-ins and loads everything else
/// with `libloading`. Loaded libraries are never unloaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

fn loaded() -> &'static Mutex<HashMap<String, Arc<dyn Module>>> {
    static LOADED: OnceLock<Mutex<HashMap<String, Arc<dyn Module>>>> = OnceLock::new();
    LOADED.get_or_init(|| Mutex::new(HashMap::new()))
}

impl ModuleLoader for SystemLoader {
    fn load(&self, path: &str) -> Result<Arc<dyn Module>> {
        if path == DEFAULT_MODULE {
            return Ok(Arc::new(BuiltinModule));
        }
        let mut cache = loaded()
            .lock()
            .map_err(|_| Error::invalid("module cache poisoned"))?;
        if let Some(module) = cache.get(path) {
            return Ok(module.clone());
        }
        let library = unsafe { libloading::Library::new(path) }
            .map_err(|e| Error::NoEntity(format!("{path}: {e}")))?;
        debug!("loaded backend module {path}");
        let module: Arc<dyn Module> = Arc::new(DynamicModule { library });
        cache.insert(path.to_string(), module.clone());
        Ok(module)
    }
}

/// Where a configured name's backend comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub kind: String,
    pub module: String,
    pub symbol: String,
}

/// Reads the `type` of `entry` and the registration of that type under
/// `type_ns`.
pub fn describe(
    conf: &ConfigNode,
    type_ns: &str,
    name: &str,
    entry: &ConfigNode,
) -> Result<BackendDescriptor> {
    if !entry.is_compound() {
        return Err(Error::invalid(format!(
            "{name}: entry must be a compound, found {}",
            entry.type_name()
        )));
    }
    let kind = entry
        .search("type")
        .ok_or_else(|| Error::invalid(format!("{name}: type is not defined")))?
        .string_value("type")?;
    let registration = conf
        .searchv(&[type_ns, kind])
        .ok_or_else(|| Error::NoEntity(format!("{type_ns}.{kind}")))?;
    if !registration.is_compound() {
        return Err(Error::invalid(format!(
            "{type_ns}.{kind}: entry must be a compound, found {}",
            registration.type_name()
        )));
    }
    let mut module = None;
    let mut symbol = None;
    for (key, node) in registration.entries() {
        match key {
            "comment" => {}
            "lib" => module = Some(node.string_value("lib")?),
            "open" => symbol = Some(node.string_value("open")?),
            other => {
                return Err(Error::invalid(format!(
                    "{type_ns}.{kind}: unknown field {other}"
                )));
            }
        }
    }
    let symbol =
        symbol.ok_or_else(|| Error::invalid(format!("{type_ns}.{kind}: open is not defined")))?;
    Ok(BackendDescriptor {
        kind: kind.to_string(),
        module: module.unwrap_or(DEFAULT_MODULE).to_string(),
        symbol: symbol.to_string(),
    })
}

pub struct Resolver<L: ModuleLoader = SystemLoader> {
    loader: L,
}

impl Resolver<SystemLoader> {
    pub fn system() -> Self {
        Self {
            loader: SystemLoader,
        }
    }
}

impl<L: ModuleLoader> Resolver<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn open_ctl(&self, conf: &ConfigNode, name: &str) -> Result<Ctl> {
        let Some(entry) = conf.searchv(&["ctl", name]) else {
            let card = card_index(name)?;
            debug!("{name}: no ctl entry, using card {card}");
            return Ctl::open_hw(card);
        };
        let desc = describe(conf, "ctltype", name, entry)?;
        let open = self
            .loader
            .load(&desc.module)?
            .ctl_entry(&desc.symbol)
            .ok_or_else(|| Error::NoOperation(format!("{}: {}", desc.module, desc.symbol)))?;
        let backend = open(name, entry)?;
        Ok(Ctl::from_backend(name, backend))
    }

    pub fn open_pcm(
        &self,
        conf: &ConfigNode,
        name: &str,
        stream: Stream,
        mode: OpenMode,
    ) -> Result<Pcm> {
        let Some(entry) = conf.searchv(&["pcm", name]) else {
            let card = card_index(name)?;
            debug!("{name}: no pcm entry, using card {card} device 0");
            let backend = pcm::hw::HwPcm::open_device(card, 0, stream, mode)?;
            return Ok(Pcm::from_backend(name, stream, mode, Box::new(backend)));
        };
        let desc = describe(conf, "pcmtype", name, entry)?;
        let open = self
            .loader
            .load(&desc.module)?
            .pcm_entry(&desc.symbol)
            .ok_or_else(|| Error::NoOperation(format!("{}: {}", desc.module, desc.symbol)))?;
        let backend = open(name, entry, stream, mode)?;
        Ok(Pcm::from_backend(name, stream, mode, backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conf(text: &str) -> ConfigNode {
        ConfigNode::from_toml(text).unwrap()
    }

    #[test]
    fn describe_defaults_to_the_main_library() {
        let c = conf(
            r#"
            [pcm.out]
            type = "hw"
            card = 0
            [pcmtype.hw]
            comment = "direct"
            open = "_snd_pcm_hw_open"
            "#,
        );
        let entry = c.searchv(&["pcm", "out"]).unwrap();
        let desc = describe(&c, "pcmtype", "out", entry).unwrap();
        assert_eq!(desc.module, DEFAULT_MODULE);
        assert_eq!(desc.symbol, PCM_HW_OPEN);
        assert_eq!(desc.kind, "hw");
    }

    #[test]
    fn describe_rejects_malformed_registrations() {
        let c = conf(
            r#"
            [ctl.a]
            type = 3
            [ctl.b]
            type = "x"
            [ctltype.x]
            open = "f"
            flavour = "odd"
            "#,
        );
        let a = c.searchv(&["ctl", "a"]).unwrap();
        assert!(matches!(describe(&c, "ctltype", "a", a), Err(Error::Invalid(_))));
        let b = c.searchv(&["ctl", "b"]).unwrap();
        assert!(matches!(describe(&c, "ctltype", "b", b), Err(Error::Invalid(_))));
        let leaf = ConfigNode::Integer(1);
        assert!(matches!(describe(&c, "ctltype", "n", &leaf), Err(Error::Invalid(_))));
    }

    #[test]
    fn builtin_module_exports_the_hw_entry_points() {
        let m = BuiltinModule;
        assert!(m.pcm_entry(PCM_HW_OPEN).is_some());
        assert!(m.ctl_entry(CTL_HW_OPEN).is_some());
        assert!(m.pcm_entry(CTL_HW_OPEN).is_none());
    }

    #[test]
    fn missing_libraries_are_no_entity() {
        let err = SystemLoader
            .load("/nonexistent/libsndhw-missing.so")
            .err()
            .unwrap();
        assert!(matches!(err, Error::NoEntity(_)));
    }
}
