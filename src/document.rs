//! Document model and loaders.
//!
//! An API document is held as a [`serde_json::Value`] tree whose mappings keep the
//! declaration order of the YAML source. Loading goes through the [`DocumentLoader`]
//! trait so the resolution pipeline never touches the filesystem directly.

use crate::error::{Error, Result};
use log::debug;
use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

/// A loaded API document.
///
/// Immutable once loaded; resolution works on copies of its fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Path of the file the document was read from
    pub path: PathBuf,
    /// The parsed document tree
    pub root: Value,
}

impl Document {
    /// Creates a document from an already parsed tree.
    pub fn new(path: impl Into<PathBuf>, root: Value) -> Self {
        Self {
            path: normalize_path(&path.into()),
            root,
        }
    }

    /// Parses YAML (or JSON, which is a YAML subset) text into a document.
    pub fn from_yaml_str(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let yaml: YamlValue = serde_yaml::from_str(content).map_err(|e| Error::ParseError {
            file: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::new(path, yaml_to_json(yaml)))
    }

    /// Looks up a value by a sequence of keys.
    ///
    /// Numeric keys index into sequences. Returns `None` as soon as a key is missing.
    pub fn get_in<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Value> {
        get_in(&self.root, keys)
    }
}

/// Walks `value` along `keys`, indexing sequences by numeric keys.
pub fn get_in<'a, S: AsRef<str>>(value: &'a Value, keys: &[S]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |current, key| {
        let key = key.as_ref();
        match current {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Source of API documents.
///
/// Implementations resolve `.yml`/`.yaml` ambiguity and report [`Error::FileNotFound`]
/// when no candidate exists.
pub trait DocumentLoader: Send + Sync {
    /// Loads the document at `path`.
    fn load(&self, path: &Path) -> Result<Arc<Document>>;
}

/// Loads YAML documents from disk, optionally caching them by path.
///
/// The cache is append-only with last-writer-wins semantics; edits to a file are not
/// observed once it has been cached.
pub struct YamlFileLoader {
    cache: Option<RwLock<HashMap<PathBuf, Arc<Document>>>>,
}

impl YamlFileLoader {
    /// Creates a loader that re-reads files on every request.
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// Creates a loader that keeps every loaded document in memory.
    pub fn cached() -> Self {
        Self {
            cache: Some(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self, path: &Path) -> Result<Arc<Document>> {
        debug!("Reading document: {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(Arc::new(Document::from_yaml_str(path, &content)?))
    }
}

impl Default for YamlFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for YamlFileLoader {
    fn load(&self, path: &Path) -> Result<Arc<Document>> {
        let resolved = candidate_paths(path)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;

        let Some(cache) = &self.cache else {
            return self.read(&resolved);
        };

        if let Some(doc) = cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&resolved)
        {
            debug!("Document cache hit: {}", resolved.display());
            return Ok(Arc::clone(doc));
        }

        let doc = self.read(&resolved)?;
        cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(resolved, Arc::clone(&doc));
        Ok(doc)
    }
}

/// In-memory document set, keyed by normalized path.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    documents: HashMap<PathBuf, Arc<Document>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document, replacing any previous one with the same path.
    pub fn insert(&mut self, document: Document) {
        self.documents
            .insert(document.path.clone(), Arc::new(document));
    }

    /// Parses `content` and adds it under `path`.
    pub fn insert_yaml(&mut self, path: impl Into<PathBuf>, content: &str) -> Result<()> {
        self.insert(Document::from_yaml_str(path, content)?);
        Ok(())
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<Arc<Document>> {
        candidate_paths(path)
            .into_iter()
            .find_map(|candidate| self.documents.get(&candidate))
            .cloned()
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
    }
}

/// The path as given, then with `.yml` and `.yaml` appended.
fn candidate_paths(path: &Path) -> Vec<PathBuf> {
    let path = normalize_path(path);
    let with_suffix = |suffix: &str| {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    };
    vec![path.clone(), with_suffix(".yml"), with_suffix(".yaml")]
}

/// Lexically normalizes a path, folding `.` and `..` components.
///
/// The filesystem is not consulted, so this works for documents that only exist in
/// memory.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Anchors a relative path at the current working directory, then normalizes it.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_path(&cwd.join(path)),
        Err(_) => normalize_path(path),
    }
}

/// Converts a YAML tree into a JSON tree.
///
/// Non-string mapping keys (status codes such as `200:` are the common case) are
/// converted to their textual form.
pub fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => yaml_number_to_json(&n),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key_to_string(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number_to_json(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn yaml_key_to_string(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Tagged(tagged) => yaml_key_to_string(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
