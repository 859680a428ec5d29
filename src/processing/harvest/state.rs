//! Resumption state of a chunk.
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};

use crate::error::Error;
use crate::io::{StreamPaths, TripleReader};
use crate::triple::{FailureRecord, Triple};

/// What a chunk already did, rebuilt from its own output files.
///
/// The triple stream gives the per-relation written counts. Triples found there
/// or in the failure stream are never considered again.
///
/// A record interrupted after its described line but before its triple line is
/// counted as written and kept as unfinished, so that only its triple line is left to write.
/// One interrupted before its described line is excluded.
#[derive(Debug, Default)]
pub struct ChunkState {
    relations: Vec<String>,
    written: HashMap<String, u64>,
    seen: HashSet<Triple>,
    unfinished: Vec<Triple>,
}

impl ChunkState {
    /// Scan the output files of a chunk owning `relations`.
    /// Missing files mean a fresh chunk. Torn last lines must have been dropped beforehand.
    pub fn rebuild(relations: Vec<String>, paths: &StreamPaths) -> Result<Self, Error> {
        let mut state = Self {
            relations,
            ..Default::default()
        };

        if paths.triples.exists() {
            let mut reader = TripleReader::from_path(&paths.triples)?;
            for triple in reader.by_ref() {
                let triple = triple?;
                if state.seen.insert(triple.clone()) {
                    *state.written.entry(triple.relation).or_insert(0) += 1;
                }
            }
            if reader.malformed() > 0 {
                warn!(
                    "ignored {} malformed lines in {:?}",
                    reader.malformed(),
                    paths.triples
                );
            }
        }

        let rejected = if paths.failed.exists() {
            state.load_failures(&paths.failed)?
        } else {
            0
        };

        let described: HashSet<Triple> = enriched_triples(&paths.descriptions)?
            .into_iter()
            .collect();
        for triple in enriched_triples(&paths.labels)? {
            if state.seen.contains(&triple) {
                continue;
            }
            if described.contains(&triple) {
                state.unfinished.push(triple.clone());
                state.mark_written(triple);
            } else {
                warn!("{triple}: labeled line without description, excluding it");
                state.seen.insert(triple);
            }
        }
        if !state.unfinished.is_empty() {
            warn!("{} records miss their triple line", state.unfinished.len());
        }

        info!(
            "resuming with {} written and {} rejected triples",
            state.written.values().sum::<u64>(),
            rejected
        );
        Ok(state)
    }

    fn load_failures(&mut self, path: &Path) -> Result<usize, Error> {
        let mut rejected = 0;
        for line in BufReader::new(File::open(path)?).lines() {
            if let Some(failure) = FailureRecord::parse(&line?) {
                self.seen.insert(failure.triple);
                rejected += 1;
            }
        }
        Ok(rejected)
    }

    /// Records whose triple line still has to be written. Empties the list.
    pub fn take_unfinished(&mut self) -> Vec<Triple> {
        std::mem::take(&mut self.unfinished)
    }

    /// Relations owned by the chunk, sorted.
    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    /// Number of distinct triples of `relation` already written.
    pub fn written(&self, relation: &str) -> u64 {
        self.written.get(relation).copied().unwrap_or(0)
    }

    pub fn is_seen(&self, triple: &Triple) -> bool {
        self.seen.contains(triple)
    }

    pub fn mark_written(&mut self, triple: Triple) {
        if !self.seen.contains(&triple) {
            *self.written.entry(triple.relation.clone()).or_insert(0) += 1;
            self.seen.insert(triple);
        }
    }

    /// Exclude `triple` from the rest of this run.
    pub fn mark_rejected(&mut self, triple: Triple) {
        self.seen.insert(triple);
    }
}

/// Triples of a labeled or described file, in file order. A missing file has none.
fn enriched_triples(path: &Path) -> Result<Vec<Triple>, Error> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut triples = Vec::new();
    for line in BufReader::new(File::open(path)?).lines() {
        if let Some(triple) = Triple::from_enriched_line(&line?) {
            triples.push(triple);
        }
    }
    Ok(triples)
}
