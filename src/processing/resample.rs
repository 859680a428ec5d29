//! Balanced subsampling of a merged described file.
//!
//! Rows are grouped by relation (third column) and each relation keeps at most its quota,
//! drawn uniformly without replacement.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::Error;
use crate::processing::quota::Quotas;
use crate::triple::DESCRIBED_HEADER;

/// Number of columns of a described row.
const DESCRIBED_COLUMNS: usize = 8;
const RELATION_COLUMN: usize = 2;

/// Sample `input` into `output` following `quotas`. Returns the number of rows written.
pub fn resample(
    input: &Path,
    quotas: &Quotas,
    output: &Path,
    seed: Option<u64>,
) -> Result<usize, Error> {
    if !input.exists() {
        return Err(Error::MissingFile(input.to_path_buf()));
    }
    let mut lines = BufReader::new(File::open(input)?).lines();
    let header = match lines.next() {
        Some(header) => header?,
        None => DESCRIBED_HEADER.to_string(),
    };

    let mut buckets: HashMap<String, Vec<String>> = HashMap::new();
    let mut skipped = 0;
    for line in lines {
        let line = line?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < DESCRIBED_COLUMNS {
            skipped += 1;
            continue;
        }
        if quotas.get(fields[RELATION_COLUMN]).is_some() {
            let relation = fields[RELATION_COLUMN].to_string();
            buckets.entry(relation).or_default().push(line);
        }
    }
    if skipped > 0 {
        debug!("skipped {} short rows", skipped);
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut out = BufWriter::new(File::create(output)?);
    writeln!(out, "{header}")?;
    let mut written = 0;
    for (relation, quota) in quotas.iter() {
        let bucket = buckets.get(relation).map(Vec::as_slice).unwrap_or_default();
        let quota = quota as usize;
        if bucket.len() < quota {
            warn!(
                "{relation}: only {} rows available for a quota of {quota}",
                bucket.len()
            );
        }
        for row in bucket.choose_multiple(&mut rng, quota) {
            writeln!(out, "{row}")?;
            written += 1;
        }
    }
    out.flush()?;

    info!("wrote {} rows to {:?}", written, output);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tempfile::tempdir;

    use super::*;
    use crate::io::read_lines;

    fn row(i: usize, relation: &str) -> String {
        format!("Q{i}\ts{i}\t{relation}\tr\tQ{}\to\tsd.\tod.", i + 1)
    }

    #[test]
    fn draws_quota_per_relation() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("described.tsv");
        let output = dir.path().join("small.tsv");

        let mut content = vec![DESCRIBED_HEADER.to_string()];
        content.extend((0..10).map(|i| row(i, "P31")));
        content.extend((10..13).map(|i| row(i, "P17")));
        content.extend((13..15).map(|i| row(i, "P999")));
        content.push("too\tshort".to_string());
        std::fs::write(&input, content.join("\n") + "\n").unwrap();

        let quotas: Quotas = [("P31".to_string(), 4), ("P17".to_string(), 5)]
            .into_iter()
            .collect();
        let written = resample(&input, &quotas, &output, Some(7)).unwrap();
        // P17 is short: all of its 3 rows are kept
        assert_eq!(written, 7);

        let lines = read_lines(&output).unwrap();
        assert_eq!(lines[0], DESCRIBED_HEADER);
        let rows: HashSet<&String> = lines[1..].iter().collect();
        assert_eq!(rows.len(), 7);
        let p31 = lines[1..].iter().filter(|l| l.contains("\tP31\t")).count();
        assert_eq!(p31, 4);
        assert!(!lines.iter().any(|l| l.contains("P999")));

        // same seed, same sample
        let again = dir.path().join("again.tsv");
        resample(&input, &quotas, &again, Some(7)).unwrap();
        assert_eq!(read_lines(&again).unwrap(), lines);
    }

    #[test]
    fn missing_input() {
        let dir = tempdir().unwrap();
        let res = resample(
            &dir.path().join("nope.tsv"),
            &Quotas::default(),
            &dir.path().join("out.tsv"),
            None,
        );
        assert!(matches!(res, Err(Error::MissingFile(_))));
    }
}
