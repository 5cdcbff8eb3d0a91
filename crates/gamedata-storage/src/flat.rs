//! Flat key-value object storage.
//!
//! The medium has a single level of keys, so objects are emulated:
//! - every property lives under `<app>_<object>__$<prop>$`
//! - every object has a metadata entry `<app>_<object>_proplist_` listing its
//!   mangled property keys joined by `,,`
//!
//! `%`, `_` and `$` inside the app and object parts are percent-escaped, so
//! the first two `_` always delimit the parts and no two (app, object, prop)
//! triples share a key.
//!
//! The metadata entry is only an index for listing and bulk deletion; property
//! contents are always read from their own entry. An empty metadata value
//! means the object exists but has no properties left.

use crate::{KeyValueMedium, ObjectStore, StorageError, StorageResult};
use std::io::ErrorKind;
use tracing::{debug, warn};

const PROP_SEPARATOR: &str = ",,";
const CHECK_KEY: &str = "storage__test__";

/// Escape the key delimiters in an app or object name.
fn escape_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for ch in part.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '_' => escaped.push_str("%5F"),
            '$' => escaped.push_str("%24"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn mangle(prop_key: &str) -> String {
    format!("${prop_key}$")
}

fn unmangle(mangled: &str) -> &str {
    mangled
        .strip_prefix('$')
        .and_then(|rest| rest.strip_suffix('$'))
        .unwrap_or(mangled)
}

/// Parsed metadata entry: the mangled property keys of one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PropList {
    mangled: Vec<String>,
}

impl PropList {
    fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        Self {
            mangled: raw.split(PROP_SEPARATOR).map(str::to_string).collect(),
        }
    }

    fn encode(&self) -> String {
        self.mangled.join(PROP_SEPARATOR)
    }

    /// Returns `false` if the key was already listed.
    fn insert(&mut self, mangled: String) -> bool {
        if self.mangled.contains(&mangled) {
            return false;
        }
        self.mangled.push(mangled);
        true
    }

    /// Returns `false` if the key was not listed.
    fn remove(&mut self, mangled: &str) -> bool {
        let before = self.mangled.len();
        self.mangled.retain(|k| k != mangled);
        self.mangled.len() != before
    }

    fn prop_keys(&self) -> Vec<String> {
        self.mangled.iter().map(|k| unmangle(k).to_string()).collect()
    }
}

/// Object storage over a flat key-value medium.
#[derive(Debug)]
pub struct FlatStore {
    /// Escaped app name, the prefix of every key.
    namespace: String,
    medium: Box<dyn KeyValueMedium>,
}

impl FlatStore {
    /// Create a store namespaced by `app_name`.
    ///
    /// The medium is checked with a write and a removal; a medium that rejects
    /// either is reported as [`StorageError::Unavailable`] here rather than on
    /// first use.
    pub fn new(
        app_name: impl Into<String>,
        medium: impl KeyValueMedium + 'static,
    ) -> StorageResult<Self> {
        Self::with_boxed(app_name, Box::new(medium))
    }

    /// Same as [`FlatStore::new`] for an already boxed medium.
    pub fn with_boxed(
        app_name: impl Into<String>,
        medium: Box<dyn KeyValueMedium>,
    ) -> StorageResult<Self> {
        medium
            .set(CHECK_KEY, b"")
            .and_then(|()| medium.remove(CHECK_KEY))
            .map_err(|e| {
                StorageError::unavailable(format!("key-value medium rejected a test write: {e}"))
            })?;

        Ok(Self {
            namespace: escape_part(&app_name.into()),
            medium,
        })
    }

    /// Get the underlying medium.
    pub fn medium(&self) -> &dyn KeyValueMedium {
        self.medium.as_ref()
    }

    fn entry_key(&self, object_key: &str, mangled_prop: &str) -> String {
        format!("{}_{}__{}", self.namespace, escape_part(object_key), mangled_prop)
    }

    fn metadata_key(&self, object_key: &str) -> String {
        format!("{}_{}_proplist_", self.namespace, escape_part(object_key))
    }

    fn load_metadata(&self, object_key: &str) -> StorageResult<Option<PropList>> {
        let Some(raw) = self.medium.get(&self.metadata_key(object_key))? else {
            return Ok(None);
        };
        let raw = String::from_utf8(raw).map_err(|e| {
            StorageError::Io(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("metadata for object {object_key} is not UTF-8: {e}"),
            ))
        })?;
        Ok(Some(PropList::parse(&raw)))
    }

    fn store_metadata(&self, object_key: &str, props: &PropList) -> StorageResult<()> {
        self.medium
            .set(&self.metadata_key(object_key), props.encode().as_bytes())
    }
}

impl ObjectStore for FlatStore {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn prop_path(&self, object_key: &str, prop_key: &str) -> String {
        self.entry_key(object_key, &mangle(prop_key))
    }

    fn list_props(&self, object_key: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .load_metadata(object_key)?
            .map(|props| props.prop_keys())
            .unwrap_or_default())
    }

    fn save_prop(&self, object_key: &str, prop_key: &str, data: &[u8]) -> StorageResult<()> {
        if prop_key.contains(PROP_SEPARATOR) {
            return Err(StorageError::invalid_key(format!(
                "property key {prop_key:?} contains {PROP_SEPARATOR:?}"
            )));
        }
        debug!(object = object_key, prop = prop_key, len = data.len(), "Saving property");

        let mangled = mangle(prop_key);
        let entry_key = self.entry_key(object_key, &mangled);

        // A missing entry parses as empty, so a new key always creates it.
        let mut props = self.load_metadata(object_key)?.unwrap_or_default();
        let is_new = props.insert(mangled);

        self.medium.set(&entry_key, data)?;
        if is_new {
            if let Err(e) = self.store_metadata(object_key, &props) {
                // Unlisted entries would be invisible to delete_object.
                if let Err(undo) = self.medium.remove(&entry_key) {
                    warn!(key = %entry_key, error = %undo, "Failed to undo property write");
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn load_prop(&self, object_key: &str, prop_key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.medium.get(&self.entry_key(object_key, &mangle(prop_key)))
    }

    fn read_prop(&self, object_key: &str, prop_key: &str, buf: &mut [u8]) -> StorageResult<usize> {
        let Some(data) = self.load_prop(object_key, prop_key)? else {
            return Ok(0);
        };
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn prop_exists(&self, object_key: &str, prop_key: &str) -> bool {
        self.medium
            .contains(&self.entry_key(object_key, &mangle(prop_key)))
            .unwrap_or(false)
    }

    fn object_exists(&self, object_key: &str) -> bool {
        self.medium
            .contains(&self.metadata_key(object_key))
            .unwrap_or(false)
    }

    fn delete_prop(&self, object_key: &str, prop_key: &str) -> StorageResult<()> {
        debug!(object = object_key, prop = prop_key, "Deleting property");
        let mangled = mangle(prop_key);
        self.medium.remove(&self.entry_key(object_key, &mangled))?;

        // The metadata entry stays even when it becomes empty.
        if let Some(mut props) = self.load_metadata(object_key)? {
            if props.remove(&mangled) {
                self.store_metadata(object_key, &props)?;
            }
        }
        Ok(())
    }

    fn delete_object(&self, object_key: &str) -> StorageResult<()> {
        let Some(props) = self.load_metadata(object_key)? else {
            return Ok(());
        };
        debug!(object = object_key, props = props.mangled.len(), "Deleting object");

        for mangled in &props.mangled {
            if let Err(e) = self.medium.remove(&self.entry_key(object_key, mangled)) {
                warn!(object = object_key, prop = unmangle(mangled), error = %e, "Failed to delete property");
                return Err(e);
            }
        }
        self.medium.remove(&self.metadata_key(object_key))
    }
}
