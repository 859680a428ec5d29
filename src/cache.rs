/*! Persistent lookup caches

A [CacheStore] maps a lookup key to a value or to a cached absence (`null` on disk).
Snapshots are pretty-printed JSON objects, rewritten whole on every save.

[CacheService] owns the label and description stores of one language, and resolves lookups
through a [KnowledgeBase], querying only keys the stores do not know about yet.
!*/
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use futures::future::join_all;
use log::{debug, info, warn};

use crate::error::Error;
use crate::lang::Lang;
use crate::remote::{KnowledgeBase, Lookup};

/// Durable key to value-or-absent mapping.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: HashMap<String, Option<String>>,
    dirty: bool,
}

impl CacheStore {
    /// Empty store, saved to `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: HashMap::new(),
            dirty: false,
        }
    }

    /// Load a snapshot.
    ///
    /// A missing, empty or malformed file yields an empty store.
    pub fn load(path: &Path) -> Self {
        let mut store = Self::new(path);
        if !path.exists() {
            debug!("no cache at {:?}, starting empty", path);
            return store;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("could not read cache {:?} ({}), starting fresh", path, e);
                return store;
            }
        };
        if text.trim().is_empty() {
            return store;
        }

        match serde_json::from_str::<HashMap<String, Option<String>>>(&text) {
            Ok(entries) => {
                info!("loaded {} cached entries from {:?}", entries.len(), path);
                store.entries = entries;
            }
            Err(e) => warn!("{:?} is not a valid cache ({}), starting fresh", path, e),
        }
        store
    }

    /// `None` if the key was never resolved, `Some(None)` for a cached absence.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries.get(key).map(Option::as_deref)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: Option<&str>) {
        self.entries
            .insert(key.to_string(), value.map(str::to_string));
        self.dirty = true;
    }

    /// Cache a definitive lookup outcome. Returns `false` for transient errors, which are not cached.
    pub fn record(&mut self, key: &str, lookup: &Lookup) -> bool {
        match lookup.cacheable() {
            Some(value) => {
                self.insert(key, value);
                true
            }
            None => false,
        }
    }

    /// Write a snapshot if anything changed since the last save.
    ///
    /// The snapshot goes to a sibling file first and is then renamed over the previous one.
    pub fn save(&mut self) -> Result<(), Error> {
        if !self.dirty {
            return Ok(());
        }

        let sorted: BTreeMap<&String, &Option<String>> = self.entries.iter().collect();
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut w = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut w, &sorted)?;
        w.flush()?;
        drop(w);
        std::fs::rename(&tmp, &self.path)?;

        debug!("saved {} entries to {:?}", self.entries.len(), self.path);
        self.dirty = false;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Label and description caches of one language.
#[derive(Debug)]
pub struct CacheService {
    labels: CacheStore,
    descriptions: CacheStore,
}

impl CacheService {
    pub fn new(labels: CacheStore, descriptions: CacheStore) -> Self {
        Self {
            labels,
            descriptions,
        }
    }

    /// Load `label_cache_<lang>.json` and `desc_cache_<lang>.json` from `dir`.
    pub fn load(dir: &Path, lang: Lang) -> Self {
        Self::new(
            CacheStore::load(&dir.join(format!("label_cache_{lang}.json"))),
            CacheStore::load(&dir.join(format!("desc_cache_{lang}.json"))),
        )
    }

    pub fn labels_store(&self) -> &CacheStore {
        &self.labels
    }

    pub fn descriptions_store(&self) -> &CacheStore {
        &self.descriptions
    }

    /// Save both stores.
    pub fn save(&mut self) -> Result<(), Error> {
        self.labels.save()?;
        self.descriptions.save()
    }

    /// Labels of `ids`, aligned with `ids`.
    ///
    /// Unknown ids are requested in a single call; known ones, absences included, never hit the network.
    pub async fn labels<K>(&mut self, kb: &K, lang: Lang, ids: &[&str]) -> Vec<Lookup>
    where
        K: KnowledgeBase + ?Sized,
    {
        let mut missing: Vec<String> = ids
            .iter()
            .filter(|id| !self.labels.contains(id))
            .map(|id| id.to_string())
            .collect();
        missing.sort_unstable();
        missing.dedup();

        let mut fresh = HashMap::new();
        if !missing.is_empty() {
            let lookups = kb.labels(&missing, lang).await;
            for (id, lookup) in missing.into_iter().zip(lookups) {
                self.labels.record(&id, &lookup);
                fresh.insert(id, lookup);
            }
        }

        ids.iter()
            .map(|id| resolve(&self.labels, &fresh, id))
            .collect()
    }

    /// Descriptions of `titles`, aligned with `titles`, fetched concurrently.
    ///
    /// Texts rejected by `accept` are cached as absent.
    pub async fn descriptions<K, F>(
        &mut self,
        kb: &K,
        lang: Lang,
        titles: &[&str],
        accept: F,
    ) -> Vec<Lookup>
    where
        K: KnowledgeBase + ?Sized,
        F: Fn(&str) -> bool,
    {
        let mut missing: Vec<&str> = titles
            .iter()
            .copied()
            .filter(|t| !self.descriptions.contains(t))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        let lookups = join_all(missing.iter().map(|title| kb.summary(title, lang))).await;
        let mut fresh = HashMap::new();
        for (title, lookup) in missing.into_iter().zip(lookups) {
            let lookup = lookup.require(&accept);
            self.descriptions.record(title, &lookup);
            fresh.insert(title.to_string(), lookup);
        }

        titles
            .iter()
            .map(|title| resolve(&self.descriptions, &fresh, title))
            .collect()
    }
}

/// Cached value if any, otherwise the uncached (transient) outcome of this round.
fn resolve(store: &CacheStore, fresh: &HashMap<String, Lookup>, key: &str) -> Lookup {
    match store.get(key) {
        Some(value) => Lookup::from_cached(value),
        None => fresh
            .get(key)
            .cloned()
            .unwrap_or_else(|| Lookup::TransientError(format!("no result for {key}"))),
    }
}
