/*! Relation quotas

Builds the quota table: how many triples to sample for each relation.

1. Relations are counted over the whole corpus and the `top_n` most frequent are kept.
1. Relations lacking a label in any target language are dropped, and the `top_m` most frequent survivors are kept.
1. Each relation gets a quota proportional to its frequency, but never less than `floor`.
1. Quotas are rebalanced so that they sum up to `target` exactly.
!*/
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use futures::stream::{self, StreamExt};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::Error;
use crate::io::TripleReader;
use crate::lang::Lang;
use crate::remote::{KnowledgeBase, Lookup};

/// Quota building parameters.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub langs: Vec<Lang>,
    /// Relations kept after counting.
    pub top_n: usize,
    /// Relations kept after label filtering.
    pub top_m: usize,
    /// Exact sum of all quotas.
    pub target: u64,
    /// Minimum quota of every kept relation.
    pub floor: u64,
    /// Label requests in flight.
    pub concurrency: usize,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            langs: Lang::ALL.to_vec(),
            top_n: 1000,
            top_m: 200,
            target: 60_000,
            floor: 50,
            concurrency: 10,
        }
    }
}

/// A row of the quota table.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRecord {
    pub relation: String,
    pub count: u64,
    pub proportion: f64,
    pub quota: u64,
    pub labels: BTreeMap<Lang, String>,
}

impl RelationRecord {
    pub fn new(relation: &str, count: u64) -> Self {
        Self {
            relation: relation.to_string(),
            count,
            proportion: 0.0,
            quota: 0,
            labels: BTreeMap::new(),
        }
    }
}

/// Count occurrences of every relation in the corpus.
pub fn count_relations(corpus: &Path) -> Result<HashMap<String, u64>, Error> {
    let mut reader = TripleReader::from_path(corpus)?;
    let mut counts = HashMap::new();
    for triple in reader.by_ref() {
        *counts.entry(triple?.relation).or_insert(0) += 1;
    }
    if reader.malformed() > 0 {
        warn!("skipped {} malformed lines in {:?}", reader.malformed(), corpus);
    }
    Ok(counts)
}

/// The `n` most frequent relations, most frequent first. Ties are ordered by relation id.
pub fn top_relations(counts: HashMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(n)
        .collect()
}

/// Keep relations that have a label in every language of `langs`, in input order.
///
/// Lookups run concurrently, `concurrency` at a time. A failed lookup counts as a missing label.
pub async fn labelled<K>(
    kb: &K,
    relations: Vec<(String, u64)>,
    langs: &[Lang],
    concurrency: usize,
) -> Vec<RelationRecord>
where
    K: KnowledgeBase + ?Sized,
{
    let looked_up: Vec<(String, u64, Vec<Lookup>)> = stream::iter(relations)
        .map(|(relation, count)| async move {
            let lookups = kb.labels_in(&relation, langs).await;
            (relation, count, lookups)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut kept = Vec::with_capacity(looked_up.len());
    for (relation, count, lookups) in looked_up {
        let mut record = RelationRecord::new(&relation, count);
        for (lang, lookup) in langs.iter().zip(lookups) {
            match lookup {
                Lookup::Found(label) => {
                    record.labels.insert(*lang, label);
                }
                Lookup::NotFound => debug!("{relation} has no {lang} label"),
                Lookup::TransientError(e) => warn!("{relation}: {lang} label lookup failed: {e}"),
            }
        }
        if record.labels.len() == langs.len() {
            kept.push(record);
        }
    }
    kept
}

pub fn quota_sum(records: &[RelationRecord]) -> u64 {
    records.iter().map(|r| r.quota).sum()
}

/// Set proportions and quotas proportional to counts, with a minimum of `floor`.
///
/// Rounding is half-to-even.
pub fn provisional_quotas(records: &mut [RelationRecord], target: u64, floor: u64) {
    let total: u64 = records.iter().map(|r| r.count).sum();
    for record in records.iter_mut() {
        record.proportion = if total > 0 {
            record.count as f64 / total as f64
        } else {
            0.0
        };
        let quota = (record.proportion * target as f64).round_ties_even() as u64;
        record.quota = quota.max(floor);
    }
}

/// Indices of `records` by descending quota. Equal quotas keep their relative order.
fn by_quota_desc(records: &[RelationRecord]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..records.len()).collect();
    indices.sort_by(|&a, &b| records[b].quota.cmp(&records[a].quota));
    indices
}

/// Adjust quotas so that they sum up to `target`, never going below `floor`.
///
/// A table that already sums to `target` is left untouched.
pub fn rebalance(records: &mut [RelationRecord], target: u64, floor: u64) {
    let sum = quota_sum(records);

    if sum > target {
        // one pass is enough: a relation only keeps more than the floor once the surplus is gone
        let mut surplus = sum - target;
        for idx in by_quota_desc(records) {
            if surplus == 0 {
                break;
            }
            let take = surplus.min(records[idx].quota.saturating_sub(floor));
            records[idx].quota -= take;
            surplus -= take;
        }
    } else if sum < target {
        let mut deficit = target - sum;
        // A pass over n > 0 relations removes min(n, deficit) >= 1 units of deficit,
        // hence at most `deficit` passes. Nothing can be added to an empty table.
        let passes = if records.is_empty() { 0 } else { deficit };
        for _ in 0..passes {
            for idx in by_quota_desc(records) {
                if deficit == 0 {
                    break;
                }
                records[idx].quota += 1;
                deficit -= 1;
            }
            if deficit == 0 {
                break;
            }
        }
    }
}

/// Provisional quotas, rebalancing and exact-sum check.
pub fn assign_quotas(records: &mut [RelationRecord], target: u64, floor: u64) -> Result<(), Error> {
    provisional_quotas(records, target, floor);
    let provisional = quota_sum(records);
    if provisional != target {
        info!("rebalancing quotas (provisional sum {provisional}, target {target})");
        rebalance(records, target, floor);
    }

    let got = quota_sum(records);
    if got != target {
        return Err(Error::QuotaMismatch {
            expected: target,
            got,
        });
    }
    Ok(())
}

/// Build the quota table from a corpus.
pub async fn build<K>(
    corpus: &Path,
    kb: &K,
    config: &QuotaConfig,
) -> Result<Vec<RelationRecord>, Error>
where
    K: KnowledgeBase + ?Sized,
{
    info!("counting relation frequencies in {:?}", corpus);
    let counts = count_relations(corpus)?;
    info!("{} distinct relations", counts.len());

    let top = top_relations(counts, config.top_n);
    info!(
        "fetching labels of {} relations in {}",
        top.len(),
        config.langs.iter().join(", ")
    );
    // `labelled` keeps the descending count order
    let mut kept = labelled(kb, top, &config.langs, config.concurrency).await;
    if kept.len() < config.top_m {
        warn!(
            "only {} relations are labelled in every language ({} requested)",
            kept.len(),
            config.top_m
        );
    }
    kept.truncate(config.top_m);

    assign_quotas(&mut kept, config.target, config.floor)?;
    info!(
        "{} relations, quotas sum to {}",
        kept.len(),
        quota_sum(&kept)
    );
    Ok(kept)
}

/// Write the quota table: `relation count proportion quota <lang>...`.
pub fn write_table(path: &Path, records: &[RelationRecord], langs: &[Lang]) -> Result<(), Error> {
    let mut w = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;

    let mut header = vec!["relation", "count", "proportion", "quota"];
    header.extend(langs.iter().map(Lang::as_str));
    w.write_record(&header)?;

    for r in records {
        let mut row = vec![
            r.relation.clone(),
            r.count.to_string(),
            format!("{:.6}", r.proportion),
            r.quota.to_string(),
        ];
        row.extend(
            langs
                .iter()
                .map(|lang| r.labels.get(lang).cloned().unwrap_or_default()),
        );
        w.write_record(&row)?;
    }
    w.flush()?;
    info!("quota table written to {:?}", path);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct QuotaRow {
    relation: String,
    quota: u64,
}

/// Relation to quota mapping, read back from a quota table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quotas {
    quotas: BTreeMap<String, u64>,
}

impl Quotas {
    /// Read a quota table. Only the `relation` and `quota` columns are used.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        let mut r = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
        let mut quotas = BTreeMap::new();
        for row in r.deserialize() {
            let row: QuotaRow = row?;
            quotas.insert(row.relation, row.quota);
        }
        debug!("read {} quotas from {:?}", quotas.len(), path);
        Ok(Self { quotas })
    }

    pub fn get(&self, relation: &str) -> Option<u64> {
        self.quotas.get(relation).copied()
    }

    /// Relation ids, sorted.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.quotas.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.quotas.iter().map(|(r, q)| (r.as_str(), *q))
    }

    pub fn total(&self) -> u64 {
        self.quotas.values().sum()
    }

    pub fn len(&self) -> usize {
        self.quotas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotas.is_empty()
    }
}

impl FromIterator<(String, u64)> for Quotas {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        Self {
            quotas: iter.into_iter().collect(),
        }
    }
}

impl From<&[RelationRecord]> for Quotas {
    fn from(records: &[RelationRecord]) -> Self {
        records
            .iter()
            .map(|r| (r.relation.clone(), r.quota))
            .collect()
    }
}
