use crate::error::{Error, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
    time::SystemTime,
};

pub const CONFIG_PATH_ENV: &str = "SNDHW_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sndhw.toml";

/// One node of the configuration tree. Compound nodes are keyed by id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigNode {
    Integer(i64),
    Real(f64),
    String(String),
    Compound(BTreeMap<String, ConfigNode>),
}

impl Default for ConfigNode {
    fn default() -> Self {
        ConfigNode::Compound(BTreeMap::new())
    }
}

impl ConfigNode {
    pub fn from_toml(text: &str) -> Result<Self> {
        let table: BTreeMap<String, ConfigNode> =
            toml::from_str(text).map_err(|e| Error::invalid(format!("config: {e}")))?;
        Ok(ConfigNode::Compound(table))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigNode::Integer(_) => "integer",
            ConfigNode::Real(_) => "real",
            ConfigNode::String(_) => "string",
            ConfigNode::Compound(_) => "compound",
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, ConfigNode::Compound(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigNode::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn search(&self, key: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Compound(map) => map.get(key),
            _ => None,
        }
    }

    pub fn searchv(&self, keys: &[&str]) -> Option<&ConfigNode> {
        keys.iter().try_fold(self, |node, key| node.search(key))
    }

    /// Children of a compound node; empty for leaves.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        let map = match self {
            ConfigNode::Compound(map) => Some(map),
            _ => None,
        };
        map.into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }

    pub fn string_value(&self, what: &str) -> Result<&str> {
        self.as_str().ok_or_else(|| {
            Error::invalid(format!("{what} must be a string, found {}", self.type_name()))
        })
    }

    pub fn integer_value(&self, what: &str) -> Result<i64> {
        self.as_integer().ok_or_else(|| {
            Error::invalid(format!(
                "{what} must be an integer, found {}",
                self.type_name()
            ))
        })
    }
}

struct Loaded {
    path: PathBuf,
    mtime: Option<SystemTime>,
    tree: Arc<ConfigNode>,
}

fn state() -> &'static Mutex<Option<Loaded>> {
    static STATE: OnceLock<Mutex<Option<Loaded>>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(None))
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Reloads the global configuration if the file changed since the last
/// call and returns the current tree. A missing file yields an empty tree.
pub fn update() -> Result<Arc<ConfigNode>> {
    let path = config_path();
    let mtime = modified(&path);
    let mut guard = state()
        .lock()
        .map_err(|_| Error::invalid("config state poisoned"))?;
    if let Some(loaded) = guard.as_ref()
        && loaded.path == path
        && loaded.mtime == mtime
    {
        return Ok(loaded.tree.clone());
    }
    let tree = match std::fs::read_to_string(&path) {
        Ok(text) => ConfigNode::from_toml(&text)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigNode::default(),
        Err(e) => return Err(e.into()),
    };
    tracing::debug!("loaded configuration from {}", path.display());
    let tree = Arc::new(tree);
    *guard = Some(Loaded {
        path,
        mtime,
        tree: tree.clone(),
    });
    Ok(tree)
}
