/*!
# kgsample

Relation-balanced sampling of knowledge graph triples, enriched with labels and descriptions
in several languages.

The pipeline goes as follows:

1. [processing::quota] counts relations over the corpus and assigns each kept relation a quota.
1. [processing::partition] splits relations across independent workers (chunks).
1. [processing::harvest] samples, enriches and writes the triples of a chunk, resuming from its own outputs.
1. [processing::merge] and [processing::dedup] combine and clean chunk outputs.

Remote lookups are abstracted behind [remote::KnowledgeBase] and memoized by [cache].
!*/
pub mod cache;
pub mod cli;
pub mod download;
pub mod error;
pub mod io;
pub mod lang;
pub mod processing;
pub mod remote;
pub mod triple;
