use crate::domain::{Asset, HistoryEntry};
use crate::store::{DataStore, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    tracked_symbols: Vec<String>,
    #[serde(default)]
    assets: BTreeMap<String, Asset>,
    #[serde(default)]
    history: BTreeMap<String, Vec<HistoryEntry>>,
}

impl Document {
    fn seed<T: AsRef<str>>(&mut self, default_symbols: &[T]) {
        if !self.tracked_symbols.is_empty() {
            return;
        }
        for symbol in default_symbols {
            let symbol = symbol.as_ref();
            if !self.tracked_symbols.iter().any(|s| s == symbol) {
                self.tracked_symbols.push(symbol.to_string());
            }
        }
    }
}

/// JSON document store. The whole document lives in memory; when backed by a
/// file, every mutation rewrites it through a temp file and a rename.
pub struct JsonStore {
    path: Option<PathBuf>,
    doc: Mutex<Document>,
}

impl JsonStore {
    /// Opens (or creates) the store at `path`, seeding the tracked set with
    /// `default_symbols` when it is empty.
    pub fn open<P: AsRef<Path>, T: AsRef<str>>(
        path: P,
        default_symbols: &[T],
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut doc = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            Document::default()
        };
        let before = doc.clone();
        doc.seed(default_symbols);
        info!(db_path = %path.display(), tracked = doc.tracked_symbols.len(), "Opened store");
        let store = Self {
            path: Some(path),
            doc: Mutex::new(doc),
        };
        let guard = store.lock()?;
        if *guard != before || !store.path_exists() {
            store.persist(&guard)?;
        }
        drop(guard);
        Ok(store)
    }

    pub fn in_memory<T: AsRef<str>>(default_symbols: &[T]) -> Self {
        let mut doc = Document::default();
        doc.seed(default_symbols);
        Self {
            path: None,
            doc: Mutex::new(doc),
        }
    }

    fn path_exists(&self) -> bool {
        self.path.as_ref().map(|p| p.exists()).unwrap_or(true)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Document>> {
        self.doc.lock().map_err(|_| StoreError::Poisoned)
    }

    fn persist(&self, doc: &Document) -> StoreResult<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, doc)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> StoreResult<R> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    /// Applies `f` to a copy and only swaps it in once it has been written out,
    /// so a failed write leaves the store untouched.
    fn write<R>(&self, f: impl FnOnce(&mut Document) -> R) -> StoreResult<R> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let out = f(&mut next);
        if next != *guard {
            self.persist(&next)?;
            *guard = next;
        }
        Ok(out)
    }
}

impl DataStore for JsonStore {
    fn get_asset(&self, symbol: &str) -> StoreResult<Option<Asset>> {
        self.read(|doc| doc.assets.get(symbol).cloned())
    }

    fn upsert_asset(&self, asset: Asset) -> StoreResult<()> {
        debug!(symbol = %asset.symbol, "Upserting asset");
        self.write(|doc| {
            doc.assets.insert(asset.symbol.clone(), asset);
        })
    }

    fn list_assets(&self) -> StoreResult<Vec<Asset>> {
        self.read(|doc| {
            doc.tracked_symbols
                .iter()
                .filter_map(|symbol| doc.assets.get(symbol).cloned())
                .collect()
        })
    }

    fn append_history(&self, symbol: &str, entry: HistoryEntry) -> StoreResult<()> {
        self.write(|doc| {
            doc.history
                .entry(symbol.to_string())
                .or_default()
                .push(entry);
        })
    }

    fn trim_history(&self, symbol: &str, max_len: usize) -> StoreResult<()> {
        let removed = self.write(|doc| match doc.history.get_mut(symbol) {
            Some(entries) if entries.len() > max_len => {
                let excess = entries.len() - max_len;
                entries.drain(..excess);
                excess
            }
            _ => 0,
        })?;
        if removed > 0 {
            debug!(symbol, removed, "History trimmed");
        }
        Ok(())
    }

    fn get_history(&self, symbol: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        self.read(|doc| {
            doc.history
                .get(symbol)
                .map(|entries| entries.iter().rev().take(limit).cloned().collect())
                .unwrap_or_default()
        })
    }

    fn list_tracked_symbols(&self) -> StoreResult<Vec<String>> {
        self.read(|doc| doc.tracked_symbols.clone())
    }

    fn add_tracked_symbol(&self, symbol: &str) -> StoreResult<bool> {
        self.write(|doc| {
            if doc.tracked_symbols.iter().any(|s| s == symbol) {
                false
            } else {
                doc.tracked_symbols.push(symbol.to_string());
                true
            }
        })
    }
}
