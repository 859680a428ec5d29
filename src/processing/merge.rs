//! Concatenation of chunk outputs.
//!
//! Each stream gets its parts concatenated in chunk order into the merged file.
//! The described stream keeps a single header: later parts have theirs dropped.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{info, warn};

use crate::error::Error;
use crate::io::{Layout, Stream};
use crate::triple::DESCRIBED_HEADER;

/// Merge every stream of `layout`. Returns the number of lines written per stream.
pub fn merge(layout: &Layout) -> Result<Vec<(Stream, usize)>, Error> {
    let mut written = Vec::with_capacity(Stream::ALL.len());
    for stream in Stream::ALL {
        let parts = layout.parts(stream)?;
        if parts.is_empty() {
            warn!("no parts found for {:?}", layout.merged(stream));
            continue;
        }
        let dst = layout.merged(stream);
        let paths: Vec<&Path> = parts.iter().map(|(_, p)| p.as_path()).collect();
        let lines = merge_parts(&paths, &dst, stream.has_header())?;
        info!("merged {} parts into {:?} ({} lines)", parts.len(), dst, lines);
        written.push((stream, lines));
    }
    Ok(written)
}

/// Concatenate `parts` into `dst`, dropping the header of every part but the first
/// when `has_header` is set.
pub fn merge_parts(parts: &[&Path], dst: &Path, has_header: bool) -> Result<usize, Error> {
    let mut out = BufWriter::new(File::create(dst)?);
    let mut lines = 0;
    for (i, part) in parts.iter().enumerate() {
        let reader = BufReader::new(File::open(part)?);
        for (j, line) in reader.lines().enumerate() {
            let line = line?;
            if has_header && i > 0 && j == 0 && line == DESCRIBED_HEADER {
                continue;
            }
            writeln!(out, "{line}")?;
            lines += 1;
        }
    }
    out.flush()?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::io::read_lines;
    use crate::lang::Lang;

    #[test]
    fn single_header_in_chunk_order() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), "kg", Lang::De, "1k");

        for (i, row) in [(0, "a"), (1, "b"), (10, "c"), (2, "d")] {
            std::fs::write(
                layout.part(Stream::Descriptions, i),
                format!("{DESCRIBED_HEADER}\n{row}\n"),
            )
            .unwrap();
            std::fs::write(layout.part(Stream::Triples, i), format!("{row}\n")).unwrap();
        }

        let written = merge(&layout).unwrap();
        assert_eq!(
            written,
            vec![(Stream::Triples, 4), (Stream::Descriptions, 5)]
        );

        let described = read_lines(&layout.merged(Stream::Descriptions)).unwrap();
        assert_eq!(described, vec![DESCRIBED_HEADER, "a", "b", "d", "c"]);
        let triples = read_lines(&layout.merged(Stream::Triples)).unwrap();
        assert_eq!(triples, vec!["a", "b", "d", "c"]);
        assert!(!layout.merged(Stream::Failed).exists());
    }

    #[test]
    fn headerless_part_keeps_first_line() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.tsv");
        let b = dir.path().join("b.tsv");
        let dst = dir.path().join("out.tsv");
        std::fs::write(&a, format!("{DESCRIBED_HEADER}\nx\n")).unwrap();
        std::fs::write(&b, "y\n").unwrap();

        let lines = merge_parts(&[a.as_path(), b.as_path()], &dst, true).unwrap();
        assert_eq!(lines, 3);
        assert_eq!(read_lines(&dst).unwrap(), vec![DESCRIBED_HEADER, "x", "y"]);
    }
}
