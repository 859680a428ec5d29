//! Duplicate counting without rewriting.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};
use runiq::filters::{DigestFilter, Filter};

use crate::error::Error;
use crate::io::{Stream, StreamPaths};

/// Line counts of a file. The header, if any, is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    pub total: usize,
    pub duplicates: usize,
}

impl DuplicateReport {
    pub fn unique(&self) -> usize {
        self.total - self.duplicates
    }
}

/// Count the lines of `path` that [super::dedup_file] would remove.
pub fn check_file(path: &Path, has_header: bool) -> Result<DuplicateReport, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut filter = DigestFilter::default();
    let mut report = DuplicateReport::default();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if has_header && i == 0 {
            continue;
        }
        report.total += 1;
        if !filter.detect(line.as_bytes()) {
            report.duplicates += 1;
        }
    }
    Ok(report)
}

/// Check every existing file of a stream set.
pub fn check_set(paths: &StreamPaths) -> Result<Vec<(Stream, DuplicateReport)>, Error> {
    let mut reports = Vec::new();
    for (stream, path) in paths.iter() {
        if !path.exists() {
            warn!("{:?} does not exist, skipping", path);
            continue;
        }
        let report = check_file(path, stream.has_header())?;
        info!(
            "{:?}: {} lines, {} duplicates",
            path, report.total, report.duplicates
        );
        reports.push((stream, report));
    }
    Ok(reports)
}
