//! Append-only writers for the four streams of a chunk.
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{info, warn};

use super::StreamPaths;
use crate::error::Error;
use crate::triple::{EnrichedTriple, FailureRecord, Triple, DESCRIBED_HEADER};

/// Holds the four output files of a chunk, opened in append mode.
///
/// Every record is written with a single write call and flushed right away,
/// so an interrupted run leaves at most one partial line per file.
/// That line is dropped when the files are reopened.
pub struct ChunkWriter {
    triples: File,
    labels: File,
    descriptions: File,
    failed: File,
}

impl ChunkWriter {
    /// Drop the unterminated last line of every existing chunk file.
    ///
    /// Has to run before the files are read back, so that a torn record is never counted.
    pub fn repair(paths: &StreamPaths) -> Result<(), Error> {
        for (_, path) in paths.iter() {
            if path.exists() {
                let mut f = OpenOptions::new().read(true).write(true).open(path)?;
                drop_partial_line(&mut f, path)?;
            }
        }
        Ok(())
    }

    /// Open (or create) the chunk files.
    ///
    /// The described stream gets its header only if it is empty.
    pub fn open(paths: &StreamPaths) -> Result<Self, Error> {
        let mut descriptions = open_append(&paths.descriptions)?;
        if descriptions.metadata()?.len() == 0 {
            write_line(&mut descriptions, DESCRIBED_HEADER)?;
        }

        Ok(Self {
            triples: open_append(&paths.triples)?,
            labels: open_append(&paths.labels)?,
            descriptions,
            failed: open_append(&paths.failed)?,
        })
    }

    /// Write an accepted triple to the triple, labeled and described streams.
    pub fn write(&mut self, enriched: &EnrichedTriple) -> Result<(), Error> {
        write_line(&mut self.labels, &enriched.labeled_line())?;
        write_line(&mut self.descriptions, &enriched.described_line())?;
        // resumption counts the triple stream, so it goes last
        write_line(&mut self.triples, &enriched.triple.to_string())
    }

    /// Write the triple line of a record whose labeled and described lines are already there.
    pub fn write_triple(&mut self, triple: &Triple) -> Result<(), Error> {
        write_line(&mut self.triples, &triple.to_string())
    }

    pub fn write_failure(&mut self, failure: &FailureRecord) -> Result<(), Error> {
        write_line(&mut self.failed, &failure.to_string())
    }
}

fn open_append(path: &Path) -> Result<File, Error> {
    info!("opening {:?}", path);
    let mut f = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;
    drop_partial_line(&mut f, path)?;
    Ok(f)
}

/// Truncates `f` right after its last newline, discarding a line left unterminated
/// by an interrupted write.
fn drop_partial_line(f: &mut File, path: &Path) -> std::io::Result<()> {
    let len = f.metadata()?.len();
    let mut buf = [0u8; 4096];
    let mut end = len;
    let keep = loop {
        if end == 0 {
            break 0;
        }
        let start = end.saturating_sub(buf.len() as u64);
        let block = &mut buf[..(end - start) as usize];
        f.seek(SeekFrom::Start(start))?;
        f.read_exact(block)?;
        if let Some(i) = block.iter().rposition(|&b| b == b'\n') {
            break start + i as u64 + 1;
        }
        end = start;
    };

    if keep < len {
        warn!(
            "{:?} ends with a partial line, dropping its last {} bytes",
            path,
            len - keep
        );
        f.set_len(keep)?;
    }
    Ok(())
}

fn write_line(f: &mut File, line: &str) -> Result<(), Error> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    f.write_all(buf.as_bytes())?;
    f.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::io::Layout;
    use crate::lang::Lang;
    use crate::triple::Reason;

    fn enriched() -> EnrichedTriple {
        EnrichedTriple {
            triple: Triple::new("Q1", "P31", "Q2"),
            subject_label: "a".into(),
            relation_label: "b".into(),
            object_label: "c".into(),
            subject_description: "d. d.".into(),
            object_description: "e. e.".into(),
        }
    }

    #[test]
    fn header_written_once() {
        let dir = tempdir().unwrap();
        let paths = Layout::new(dir.path(), "kg", Lang::En, "1k").chunk_paths(0);

        let mut w = ChunkWriter::open(&paths).unwrap();
        w.write(&enriched()).unwrap();
        drop(w);
        let mut w = ChunkWriter::open(&paths).unwrap();
        w.write(&enriched()).unwrap();
        w.write_failure(&FailureRecord::new(
            Triple::new("Q3", "P31", "Q4"),
            Reason::MissingLabel,
        ))
        .unwrap();
        drop(w);

        let described = std::fs::read_to_string(&paths.descriptions).unwrap();
        let lines: Vec<&str> = described.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], DESCRIBED_HEADER);

        let triples = std::fs::read_to_string(&paths.triples).unwrap();
        assert_eq!(triples, "Q1\tP31\tQ2\nQ1\tP31\tQ2\n");
        let failed = std::fs::read_to_string(&paths.failed).unwrap();
        assert_eq!(failed, "Q3\tP31\tQ4\tMISSING_LABEL\n");
    }

    #[test]
    fn partial_line_is_dropped() {
        let dir = tempdir().unwrap();
        let paths = Layout::new(dir.path(), "kg", Lang::En, "1k").chunk_paths(0);
        std::fs::write(&paths.triples, "Q1\tP31\tQ2\nQ5\tP3").unwrap();

        let mut w = ChunkWriter::open(&paths).unwrap();
        w.write(&enriched()).unwrap();
        drop(w);

        let triples = std::fs::read_to_string(&paths.triples).unwrap();
        assert_eq!(triples, "Q1\tP31\tQ2\nQ1\tP31\tQ2\n");
    }

    #[test]
    fn repair_truncates_every_stream() {
        let dir = tempdir().unwrap();
        let paths = Layout::new(dir.path(), "kg", Lang::En, "1k").chunk_paths(0);
        // longer than one read block, no newline at all
        let torn = "x".repeat(5000);
        std::fs::write(&paths.labels, &torn).unwrap();
        std::fs::write(&paths.descriptions, &DESCRIBED_HEADER[..12]).unwrap();
        std::fs::write(&paths.failed, "Q3\tP31\tQ4\tMISSING_LABEL\n").unwrap();

        ChunkWriter::repair(&paths).unwrap();
        assert!(!paths.triples.exists());
        assert_eq!(std::fs::read_to_string(&paths.labels).unwrap(), "");
        assert_eq!(std::fs::read_to_string(&paths.descriptions).unwrap(), "");
        assert_eq!(
            std::fs::read_to_string(&paths.failed).unwrap(),
            "Q3\tP31\tQ4\tMISSING_LABEL\n"
        );

        // a torn header is written again in full
        drop(ChunkWriter::open(&paths).unwrap());
        assert_eq!(
            std::fs::read_to_string(&paths.descriptions).unwrap(),
            format!("{DESCRIBED_HEADER}\n")
        );
    }

    #[test]
    fn write_triple_only() {
        let dir = tempdir().unwrap();
        let paths = Layout::new(dir.path(), "kg", Lang::En, "1k").chunk_paths(0);
        let mut w = ChunkWriter::open(&paths).unwrap();
        w.write_triple(&Triple::new("Q1", "P31", "Q2")).unwrap();
        drop(w);

        assert_eq!(std::fs::read_to_string(&paths.triples).unwrap(), "Q1\tP31\tQ2\n");
        assert_eq!(std::fs::read_to_string(&paths.labels).unwrap(), "");
    }
}
