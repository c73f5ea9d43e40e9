//! `$ref` resolution and schema composition.
//!
//! Resolution is a pure transform: it reads fragments of loaded documents and builds a
//! new tree in which every reachable `$ref` has been replaced by its target, `allOf`
//! has been merged, and `not`/`discriminator` have been dropped. `oneOf`/`anyOf` are
//! resolved but kept, leaving the choice of alternative to the sampler.
//!
//! References form a directed graph whose nodes are `(file, pointer)` pairs. The
//! resolver keeps the chain of nodes it is currently expanding; reaching a node that is
//! already on the chain is a [`Error::CircularReference`].

use crate::assembler::deep_merge;
use crate::document::{absolute_path, get_in, normalize_path, Document, DocumentLoader};
use crate::error::{Error, Result};
use log::debug;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default bound on the length of a `$ref` chain.
pub const DEFAULT_MAX_DEPTH: usize = 64;

const REF: &str = "$ref";

/// A node of the reference graph: a JSON pointer inside a particular file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefNode {
    pub file: PathBuf,
    /// Pointer part after `#`; empty when the whole file is referenced
    pub pointer: String,
}

impl fmt::Display for RefNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.display(), self.pointer)
    }
}

/// The two halves of a `$ref` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefParts<'a> {
    /// File part before `#`; empty for same-document references
    pub file: &'a str,
    /// Pointer part after `#`, or `None` when the value has no `#`
    pub pointer: Option<&'a str>,
}

/// Splits a `$ref` value into its file and pointer parts.
pub fn parse_ref(value: &str) -> Result<RefParts<'_>> {
    let mut parts = value.splitn(2, '#');
    let file = parts.next().unwrap_or_default();
    let pointer = parts.next();
    if pointer.is_some_and(|p| p.contains('#')) {
        return Err(Error::MalformedPointer(value.to_string()));
    }
    Ok(RefParts { file, pointer })
}

/// Splits a JSON pointer into decoded key segments, dropping a leading `/`.
///
/// Returns `None` for an empty pointer, which addresses nothing.
pub fn pointer_segments(pointer: &str) -> Option<Vec<String>> {
    if pointer.is_empty() {
        return None;
    }
    let pointer = pointer.strip_prefix('/').unwrap_or(pointer);
    Some(pointer.split('/').map(decode_segment).collect())
}

fn decode_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded).decode_utf8_lossy().into_owned()
}

fn is_remote(file_part: &str) -> bool {
    file_part.contains("://")
}

/// Rewrites every `$ref` inside a document loaded from `file` so that it names its
/// target file explicitly.
///
/// Same-document references (`#/...`) gain `file` as their file part; references to
/// other files are re-based onto the directory of `file`. The result can be resolved
/// from any base directory as long as `file` is absolute.
pub fn rewrite_refs(value: &Value, file: &Path) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| rewrite_refs(v, file)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| {
                    let rewritten = match (key.as_str(), v) {
                        (REF, Value::String(reference)) => {
                            Value::String(rewrite_ref(reference, file))
                        }
                        _ => rewrite_refs(v, file),
                    };
                    (key.clone(), rewritten)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn rewrite_ref(reference: &str, file: &Path) -> String {
    let Ok(parts) = parse_ref(reference) else {
        return reference.to_string();
    };
    if is_remote(parts.file) {
        return reference.to_string();
    }
    let target = if parts.file.is_empty() {
        file.to_path_buf()
    } else {
        normalize_path(&base_dir(file).join(parts.file))
    };
    match parts.pointer {
        Some(pointer) => format!("{}#{}", target.display(), pointer),
        None => target.display().to_string(),
    }
}

fn base_dir(file: &Path) -> &Path {
    file.parent().unwrap_or_else(|| Path::new(""))
}

/// Resolves fragments of a root document, loading referenced files on demand.
pub struct Resolver<'a> {
    loader: &'a dyn DocumentLoader,
    root_path: PathBuf,
    /// Root references already resolve against the root directory, so the root tree
    /// is used as loaded
    root_tree: Arc<Value>,
    max_depth: usize,
    /// Rewritten trees of loaded files, keyed by requested path
    documents: HashMap<PathBuf, (PathBuf, Arc<Value>)>,
    /// The reference chain currently being expanded
    chain: Vec<RefNode>,
}

impl<'a> Resolver<'a> {
    pub fn new(loader: &'a dyn DocumentLoader, root: Arc<Document>) -> Self {
        Self {
            loader,
            root_path: absolute_path(&root.path),
            root_tree: Arc::new(root.root.clone()),
            max_depth: DEFAULT_MAX_DEPTH,
            documents: HashMap::new(),
            chain: Vec::new(),
        }
    }

    /// Sets the maximum length of a `$ref` chain.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolves a fragment taken from the root document.
    ///
    /// Returns `None` when the fragment is a reference to something that does not exist.
    pub fn resolve(&mut self, fragment: &Value) -> Result<Option<Value>> {
        let root_path = self.root_path.clone();
        self.resolve_fragment(fragment, &root_path)
    }

    /// Resolves a fragment taken from the document at `current_file`.
    pub fn resolve_fragment(&mut self, fragment: &Value, current_file: &Path) -> Result<Option<Value>> {
        self.chain.clear();
        let current_file = absolute_path(current_file);
        self.resolve_value(fragment, &current_file)
    }

    fn resolve_value(&mut self, value: &Value, file: &Path) -> Result<Option<Value>> {
        match value {
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    resolved.push(self.resolve_value(item, file)?.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(resolved)))
            }
            Value::Object(map) => self.resolve_object(map, file),
            scalar => Ok(Some(scalar.clone())),
        }
    }

    fn resolve_object(&mut self, map: &Map<String, Value>, file: &Path) -> Result<Option<Value>> {
        // A reference replaces the whole fragment; sibling keywords are ignored.
        if let Some(reference) = map.get(REF) {
            return self.follow(reference, file);
        }

        if let Some(all_of) = map.get("allOf") {
            return match self.resolve_value(all_of, file)? {
                Some(Value::Array(parts)) => Ok(Some(
                    parts
                        .into_iter()
                        .filter(|part| !part.is_null())
                        .fold(Value::Object(Map::new()), deep_merge),
                )),
                other => Ok(other),
            };
        }

        let mut resolved = Map::new();
        for (key, value) in map {
            let entry = match key.as_str() {
                "not" | "discriminator" => continue,
                "properties" => match value.as_object() {
                    Some(properties) => Some(self.resolve_properties(properties, file)?),
                    None => self.resolve_value(value, file)?,
                },
                _ => self.resolve_value(value, file)?,
            };
            if let Some(entry) = entry {
                resolved.insert(key.clone(), entry);
            }
        }
        Ok(Some(Value::Object(resolved)))
    }

    /// Property names are data, not keywords: a property called `not` is kept.
    fn resolve_properties(&mut self, properties: &Map<String, Value>, file: &Path) -> Result<Value> {
        let mut resolved = Map::new();
        for (name, schema) in properties {
            if let Some(schema) = self.resolve_value(schema, file)? {
                resolved.insert(name.clone(), schema);
            }
        }
        Ok(Value::Object(resolved))
    }

    fn follow(&mut self, reference: &Value, file: &Path) -> Result<Option<Value>> {
        let reference = reference
            .as_str()
            .ok_or_else(|| Error::MalformedPointer(reference.to_string()))?;
        let parts = parse_ref(reference)?;
        debug!("Resolving $ref {} from {}", reference, file.display());

        let target_path = if parts.file.is_empty() {
            file.to_path_buf()
        } else {
            normalize_path(&base_dir(file).join(parts.file))
        };

        let segments = match parts.pointer {
            Some(pointer) => match pointer_segments(pointer) {
                Some(segments) => segments,
                None => {
                    debug!("Empty pointer in $ref {}", reference);
                    return Ok(None);
                }
            },
            None => Vec::new(),
        };

        let (actual_path, tree) = self.tree(&target_path)?;
        let node = RefNode {
            file: actual_path.clone(),
            pointer: parts.pointer.unwrap_or_default().to_string(),
        };

        if self.chain.contains(&node) {
            let mut chain: Vec<String> = self.chain.iter().map(ToString::to_string).collect();
            chain.push(node.to_string());
            return Err(Error::CircularReference { chain });
        }
        if self.chain.len() >= self.max_depth {
            return Err(Error::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }

        let Some(target) = get_in(&tree, &segments) else {
            debug!("$ref target {} not found", node);
            return Ok(None);
        };

        self.chain.push(node);
        let resolved = self.resolve_value(target, &actual_path)?;
        self.chain.pop();
        Ok(resolved)
    }

    /// The tree of the document at `path`, loading and rewriting it on first use.
    fn tree(&mut self, path: &Path) -> Result<(PathBuf, Arc<Value>)> {
        if path == self.root_path {
            return Ok((self.root_path.clone(), Arc::clone(&self.root_tree)));
        }
        if let Some(entry) = self.documents.get(path) {
            return Ok(entry.clone());
        }

        let document = self.loader.load(path)?;
        let actual_path = absolute_path(&document.path);
        debug!("Loaded referenced document {}", actual_path.display());
        let entry = (
            actual_path.clone(),
            Arc::new(rewrite_refs(&document.root, &actual_path)),
        );
        self.documents.insert(path.to_path_buf(), entry.clone());
        Ok(entry)
    }
}

/// Resolves a fragment of `root` in one call.
pub fn resolve(
    fragment: &Value,
    root: Arc<Document>,
    loader: &dyn DocumentLoader,
) -> Result<Option<Value>> {
    Resolver::new(loader, root).resolve(fragment)
}
