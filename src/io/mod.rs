/*!
# IO utilities

File naming, append-only chunk output and line readers for corpus and output files.
!*/
mod chunkwriter;
mod layout;
mod triples;

pub use chunkwriter::ChunkWriter;
pub use layout::{Layout, Stream, StreamPaths};
pub use triples::{read_lines, TripleReader};
