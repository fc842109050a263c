//! Wallet address → Discord identity mapping store.
//!
//! Holds the authoritative copy of the mappings in memory and persists the
//! whole set to a single JSON document after every change. All mutations
//! go through one lock, so the conflict check, the update, and the write
//! happen as a single unit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{LinkError, Result};

/// Normalize a wallet address for use as a mapping key.
///
/// Returns `None` for an empty (or whitespace-only) address.
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Result of a successful link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The address had no mapping before.
    Created,
    /// The address was already mapped to the same identity.
    Unchanged,
    /// The address was mapped to a different identity, which is now free.
    Replaced { previous: String },
}

/// In-memory mappings plus the reverse index used for conflict checks.
#[derive(Debug, Clone, Default)]
struct MappingTable {
    /// Lowercase address → identity. Ordered so the document is stable.
    by_address: BTreeMap<String, String>,
    /// Identity → addresses bound to it. More than one address only occurs
    /// in documents written before conflicts were rejected.
    by_identity: HashMap<String, BTreeSet<String>>,
}

impl MappingTable {
    fn from_document(document: BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        for (address, identity) in document {
            match normalize_address(&address) {
                Some(key) => {
                    table.insert(key, identity);
                }
                None => tracing::warn!("Skipping mapping with empty address"),
            }
        }

        for (identity, addresses) in &table.by_identity {
            if addresses.len() > 1 {
                tracing::warn!(
                    identity = identity.as_str(),
                    addresses = addresses.len(),
                    "Identity is bound to several addresses; new links to it will conflict"
                );
            }
        }
        table
    }

    /// Address already bound to `identity`, other than `address`.
    fn conflicting_address(&self, address: &str, identity: &str) -> Option<&String> {
        self.by_identity
            .get(identity)
            .and_then(|addresses| addresses.iter().find(|a| a.as_str() != address))
    }

    fn insert(&mut self, address: String, identity: String) -> Option<String> {
        let previous = self.by_address.insert(address.clone(), identity.clone());
        if let Some(ref old) = previous {
            self.unindex(old, &address);
        }
        self.by_identity.entry(identity).or_default().insert(address);
        previous
    }

    fn remove(&mut self, address: &str) -> Option<String> {
        let identity = self.by_address.remove(address)?;
        self.unindex(&identity, address);
        Some(identity)
    }

    fn unindex(&mut self, identity: &str, address: &str) {
        if let Some(addresses) = self.by_identity.get_mut(identity) {
            addresses.remove(address);
            if addresses.is_empty() {
                self.by_identity.remove(identity);
            }
        }
    }
}

/// File-backed mapping store.
///
/// Cheap to clone; clones share the same table and lock. Writes are
/// synchronous and happen under the lock, so a link or delete blocks its
/// runtime worker for the duration of one small file write and rename.
#[derive(Clone)]
pub struct MappingStore {
    table: Arc<Mutex<MappingTable>>,
    path: Arc<PathBuf>,
}

impl MappingStore {
    /// Open the store backed by `path`, loading whatever is on disk.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = Self::load(&path);
        let table = MappingTable::from_document(document);

        tracing::info!(
            mappings = table.by_address.len(),
            path = %path.display(),
            "Mapping store opened"
        );

        Self {
            table: Arc::new(Mutex::new(table)),
            path: Arc::new(path),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Read the mappings document.
    ///
    /// A missing file is initialized with an empty document. A file that
    /// cannot be read or parsed is logged and treated as empty.
    pub fn load(path: &Path) -> BTreeMap<String, String> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No mappings file, initializing an empty one");
            if let Err(e) = Self::save(path, &BTreeMap::new()) {
                tracing::error!(error = %e, path = %path.display(), "Failed to initialize mappings file");
            }
            return BTreeMap::new();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(document) => document,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        path = %path.display(),
                        "Failed to parse mappings file, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Failed to read mappings file, starting empty"
                );
                BTreeMap::new()
            }
        }
    }

    /// Write the full mappings document.
    ///
    /// Writes to a sibling temp file and renames it over the target, so a
    /// reader never sees a half-written document.
    pub fn save(path: &Path, document: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path(path);
        std::fs::write(&tmp_path, json)?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, MappingTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Identity linked to `address`, if any.
    pub fn get(&self, address: &str) -> Option<String> {
        let key = normalize_address(address)?;
        self.lock().by_address.get(&key).cloned()
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.lock().by_address.len()
    }

    /// Whether the store holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every mapping, keyed by lowercase address.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().by_address.clone()
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Bind `address` to `identity`.
    ///
    /// Fails with [`LinkError::Conflict`] when the identity is already bound
    /// to a different address. The in-memory table only changes once the
    /// document has been written.
    pub fn link(&self, address: &str, identity: &str) -> Result<LinkOutcome> {
        let key = normalize_address(address)
            .ok_or_else(|| LinkError::BadRequest("Address is required".to_string()))?;

        let mut table = self.lock();

        if let Some(existing) = table.conflicting_address(&key, identity) {
            return Err(LinkError::Conflict {
                existing_address: existing.clone(),
            });
        }

        if table.by_address.get(&key).map(String::as_str) == Some(identity) {
            return Ok(LinkOutcome::Unchanged);
        }

        let mut next = table.clone();
        let previous = next.insert(key, identity.to_string());
        Self::save(&self.path, &next.by_address)?;
        *table = next;

        Ok(match previous {
            Some(previous) => LinkOutcome::Replaced { previous },
            None => LinkOutcome::Created,
        })
    }

    /// Remove the mapping for `address`.
    ///
    /// Returns `Ok(false)` when there was nothing to remove.
    pub fn delete(&self, address: &str) -> Result<bool> {
        let Some(key) = normalize_address(address) else {
            return Ok(false);
        };

        let mut table = self.lock();
        if !table.by_address.contains_key(&key) {
            return Ok(false);
        }

        let mut next = table.clone();
        next.remove(&key);
        Self::save(&self.path, &next.by_address)?;
        *table = next;
        Ok(true)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
