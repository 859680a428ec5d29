/*! Deduplication

Exact duplicate lines are removed using [runiq](https://github.com/whitfin/runiq)'s digest filter.
The first occurrence of a line is kept, in place, and a header line is never considered a duplicate.
!*/
pub mod check;

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use runiq::filters::{DigestFilter, Filter};

use crate::error::Error;
use crate::io::{Stream, StreamPaths};

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Remove duplicate lines of `path` in place. Returns the number of removed lines.
///
/// When `has_header` is set, the first line is kept verbatim.
pub fn dedup_file(path: &Path, has_header: bool) -> Result<usize, Error> {
    let reader = BufReader::new(File::open(path)?);
    let tmp = tmp_path(path);
    let mut out = BufWriter::new(File::create(&tmp)?);
    let mut filter = DigestFilter::default();

    let mut removed = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if (has_header && i == 0) || filter.detect(line.as_bytes()) {
            writeln!(out, "{line}")?;
        } else {
            removed += 1;
        }
    }
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    std::fs::rename(&tmp, path)?;
    Ok(removed)
}

/// Deduplicate every existing file of a stream set.
pub fn dedup_set(paths: &StreamPaths) -> Result<Vec<(Stream, usize)>, Error> {
    let mut removed = Vec::new();
    for (stream, path) in paths.iter() {
        if !path.exists() {
            warn!("{:?} does not exist, skipping", path);
            continue;
        }
        let n = dedup_file(path, stream.has_header())?;
        info!("{:?}: removed {} duplicates", path, n);
        removed.push((stream, n));
    }
    Ok(removed)
}
