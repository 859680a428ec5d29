/*! Chunk harvesting

For each relation of a chunk, candidate triples are drawn from the corpus until the relation's quota is met:

1. Subject, relation and object get their labels. A missing label rejects the triple (`MISSING_LABEL`).
1. Subject and object labels get their descriptions, concurrently. A missing or too short description rejects the triple (`MISSING_DESCRIPTION`).
1. Accepted triples are written to the triple, labeled and described streams, rejected ones to the failure stream.

Output files are append-only and are the only resumption state: a rerun of the same chunk
reads them back and carries on without emitting any triple twice.
Lookups go through the label and description caches, which are saved every few accepted triples.
!*/
mod state;

pub use state::ChunkState;

use std::collections::HashMap;
use std::path::Path;

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::cache::CacheService;
use crate::error::Error;
use crate::io::{ChunkWriter, StreamPaths, TripleReader};
use crate::lang::Lang;
use crate::processing::quota::Quotas;
use crate::remote::{KnowledgeBase, Lookup};
use crate::triple::{EnrichedTriple, FailureRecord, Reason, Triple};

/// Minimum number of `.` in an acceptable description.
pub const MIN_SENTENCE_MARKS: usize = 2;

/// Whether a description is long enough to be kept.
pub fn is_substantial(text: &str) -> bool {
    text.matches('.').count() >= MIN_SENTENCE_MARKS
}

/// Harvesting parameters.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Maximum number of candidates drawn per relation.
    pub pool_cap: usize,
    /// Candidates tried without any success before a relation is abandoned.
    pub give_up_after: usize,
    /// Accepted triples between two cache saves.
    pub checkpoint_every: usize,
    /// Seed of the candidate shuffling. Random if unset.
    pub seed: Option<u64>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            pool_cap: 500_000,
            give_up_after: 900_000,
            checkpoint_every: 10,
            seed: None,
        }
    }
}

/// Outcome of a relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationReport {
    pub relation: String,
    pub quota: u64,
    /// Triples written by previous runs.
    pub already: u64,
    pub added: u64,
    pub attempted: u64,
    pub abandoned: bool,
}

/// Outcome of a chunk run.
#[derive(Debug, Default)]
pub struct ChunkReport {
    pub relations: Vec<RelationReport>,
}

impl ChunkReport {
    /// Triples written by this run.
    pub fn written(&self) -> u64 {
        self.relations.iter().map(|r| r.added).sum()
    }
}

enum Enrichment {
    Accepted(EnrichedTriple),
    Rejected(Reason),
    /// A lookup failed: leave the triple to a later run.
    Deferred,
}

/// Found values, or why they can't all be used.
fn settle(lookups: Vec<Lookup>, reason: Reason) -> Result<Vec<String>, Enrichment> {
    if lookups.iter().any(|l| *l == Lookup::NotFound) {
        return Err(Enrichment::Rejected(reason));
    }
    lookups
        .into_iter()
        .map(|l| match l {
            Lookup::Found(v) => Ok(v),
            _ => Err(Enrichment::Deferred),
        })
        .collect()
}

/// Group the corpus triples of `relations` by relation.
pub fn bucket_corpus(
    corpus: &Path,
    relations: &[String],
) -> Result<HashMap<String, Vec<Triple>>, Error> {
    let mut buckets: HashMap<String, Vec<Triple>> = relations
        .iter()
        .map(|r| (r.clone(), Vec::new()))
        .collect();

    let mut reader = TripleReader::from_path(corpus)?;
    for triple in reader.by_ref() {
        let triple = triple?;
        if let Some(bucket) = buckets.get_mut(&triple.relation) {
            bucket.push(triple);
        }
    }
    if reader.malformed() > 0 {
        warn!("skipped {} malformed lines in {:?}", reader.malformed(), corpus);
    }
    Ok(buckets)
}

/// Samples and enriches the triples of one chunk.
pub struct Harvester<'a, K: ?Sized> {
    kb: &'a K,
    caches: CacheService,
    lang: Lang,
    config: HarvestConfig,
    rng: StdRng,
    since_checkpoint: usize,
}

impl<'a, K> Harvester<'a, K>
where
    K: KnowledgeBase + ?Sized,
{
    pub fn new(kb: &'a K, caches: CacheService, lang: Lang, config: HarvestConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            kb,
            caches,
            lang,
            config,
            rng,
            since_checkpoint: 0,
        }
    }

    pub fn save_caches(&mut self) -> Result<(), Error> {
        self.since_checkpoint = 0;
        self.caches.save()
    }

    /// Save caches, logging failures: losing a snapshot only costs lookups.
    fn checkpoint(&mut self) {
        if let Err(e) = self.save_caches() {
            error!("could not save caches: {}", e);
        }
    }

    /// Harvest every relation of `relations` into the chunk files at `paths`.
    pub async fn run(
        &mut self,
        quotas: &Quotas,
        relations: Vec<String>,
        corpus: &Path,
        paths: &StreamPaths,
    ) -> Result<ChunkReport, Error> {
        ChunkWriter::repair(paths)?;
        let mut state = ChunkState::rebuild(relations, paths)?;
        let unfinished = state.take_unfinished();
        if !unfinished.is_empty() {
            let mut out = ChunkWriter::open(paths)?;
            for triple in &unfinished {
                out.write_triple(triple)?;
            }
            info!("completed {} interrupted records", unfinished.len());
        }

        let buckets = bucket_corpus(corpus, state.relations())?;

        let mut report = ChunkReport::default();
        if buckets.values().all(Vec::is_empty) {
            warn!("no triples found for this chunk: either already done or no matching relations");
            return Ok(report);
        }

        let mut out = ChunkWriter::open(paths)?;
        let relations = state.relations().to_vec();
        for (i, relation) in relations.iter().enumerate() {
            debug!("relation {}/{}: {}", i + 1, relations.len(), relation);
            let quota = quotas.get(relation).unwrap_or(0);
            let bucket = buckets
                .get(relation)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let relation_report = self
                .harvest_relation(relation, quota, bucket, &mut state, &mut out)
                .await?;
            report.relations.push(relation_report);
            self.checkpoint();
        }

        info!("chunk done: wrote {} new triples", report.written());
        Ok(report)
    }

    async fn harvest_relation(
        &mut self,
        relation: &str,
        quota: u64,
        bucket: &[Triple],
        state: &mut ChunkState,
        out: &mut ChunkWriter,
    ) -> Result<RelationReport, Error> {
        let already = state.written(relation);
        let mut report = RelationReport {
            relation: relation.to_string(),
            quota,
            already,
            ..Default::default()
        };
        if already >= quota {
            info!("skipping {relation}: already reached {already}/{quota}");
            return Ok(report);
        }

        let remaining = quota - already;
        info!("processing {relation}: need {remaining} more triples ({already}/{quota})");

        let mut pool: Vec<&Triple> = bucket.iter().filter(|t| !state.is_seen(t)).collect();
        pool.shuffle(&mut self.rng);
        pool.truncate(self.config.pool_cap);

        for triple in pool {
            if report.added >= remaining {
                break;
            }
            if report.added == 0 && report.attempted >= self.config.give_up_after as u64 {
                warn!(
                    "{relation}: gave up after {} attempts, no usable triples",
                    report.attempted
                );
                report.abandoned = true;
                break;
            }
            // the corpus may hold the same triple more than once
            if state.is_seen(triple) {
                continue;
            }
            report.attempted += 1;

            match self.enrich(triple).await {
                Enrichment::Accepted(enriched) => {
                    out.write(&enriched)?;
                    state.mark_written(enriched.triple);
                    report.added += 1;

                    self.since_checkpoint += 1;
                    if self.since_checkpoint >= self.config.checkpoint_every {
                        self.checkpoint();
                    }
                }
                Enrichment::Rejected(reason) => {
                    out.write_failure(&FailureRecord::new(triple.clone(), reason))?;
                    state.mark_rejected(triple.clone());
                }
                Enrichment::Deferred => {
                    debug!("{triple}: lookup failed, left for a later run");
                    state.mark_rejected(triple.clone());
                }
            }
        }

        info!(
            "{relation}: added {} new triples ({}+{}/{}), {} attempted",
            report.added, already, report.added, quota, report.attempted
        );
        Ok(report)
    }

    async fn enrich(&mut self, triple: &Triple) -> Enrichment {
        let kb = self.kb;
        let ids = [
            triple.subject.as_str(),
            triple.relation.as_str(),
            triple.object.as_str(),
        ];
        let labels = self.caches.labels(kb, self.lang, &ids).await;
        let [subject_label, relation_label, object_label]: [String; 3] =
            match settle(labels, Reason::MissingLabel).map(<[String; 3]>::try_from) {
                Ok(Ok(labels)) => labels,
                Ok(Err(_)) => return Enrichment::Deferred,
                Err(e) => return e,
            };

        let titles = [subject_label.as_str(), object_label.as_str()];
        let descriptions = self
            .caches
            .descriptions(kb, self.lang, &titles, is_substantial)
            .await;
        let [subject_description, object_description]: [String; 2] =
            match settle(descriptions, Reason::MissingDescription).map(<[String; 2]>::try_from) {
                Ok(Ok(descriptions)) => descriptions,
                Ok(Err(_)) => return Enrichment::Deferred,
                Err(e) => return e,
            };

        Enrichment::Accepted(EnrichedTriple {
            triple: triple.clone(),
            subject_label,
            relation_label,
            object_label,
            subject_description,
            object_description,
        })
    }
}
