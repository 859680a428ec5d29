/*! Sampling and post-processing

- [quota] builds the per-relation quota table.
- [partition] assigns relations to chunks.
- [harvest] samples and enriches the triples of one chunk.
- [merge] and [dedup] combine and clean chunk outputs.
- [resample] draws a smaller balanced subset from a merged output.
!*/
pub mod dedup;
pub mod harvest;
pub mod merge;
pub mod partition;
pub mod quota;
pub mod resample;
