//! Line readers.
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use log::debug;

use crate::error::Error;
use crate::triple::Triple;

/// Iterates over the triples of a `subject\trelation\tobject` file.
///
/// Blank and malformed lines are skipped and counted.
pub struct TripleReader<R> {
    lines: Lines<R>,
    line_no: usize,
    malformed: usize,
}

impl TripleReader<BufReader<File>> {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> TripleReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            malformed: 0,
        }
    }

    /// Number of non-blank lines skipped so far.
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

impl<R: BufRead> Iterator for TripleReader<R> {
    type Item = Result<Triple, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match Triple::parse(&line) {
                Some(triple) => return Some(Ok(triple)),
                None => {
                    debug!("skipping malformed line {}: {:?}", self.line_no, line);
                    self.malformed += 1;
                }
            }
        }
    }
}

/// Every line of a file, without line terminators.
pub fn read_lines(path: &Path) -> Result<Vec<String>, Error> {
    if !path.exists() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }
    let f = BufReader::new(File::open(path)?);
    Ok(f.lines().collect::<Result<_, _>>()?)
}
