//! Triples and the records written for them.
//!
//! Every output stream is tab-separated, one record per line.
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Header of the described-triples stream.
pub const DESCRIBED_HEADER: &str = "subject_id\tsubject_label\trelation_id\trelation_label\tobject_id\tobject_label\tsubject_description\tobject_description";

/// A `(subject, relation, object)` fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Parse a `subject\trelation\tobject` line.
    ///
    /// Returns [None] on anything else, including lines carrying extra fields.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim_end_matches(['\n', '\r']).split('\t');
        let (s, r, o) = (fields.next()?, fields.next()?, fields.next()?);
        if fields.next().is_some() || s.is_empty() || r.is_empty() || o.is_empty() {
            return None;
        }
        Some(Self::new(s, r, o))
    }

    /// Triple of a labeled or described line: ids are in columns 0, 2 and 4.
    ///
    /// The described header is not a record and gives [None].
    pub fn from_enriched_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line == DESCRIBED_HEADER {
            return None;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 6 || [0, 2, 4].iter().any(|&i| fields[i].is_empty()) {
            return None;
        }
        Some(Self::new(fields[0], fields[2], fields[4]))
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.subject, self.relation, self.object)
    }
}

/// A triple along with its labels and the descriptions of its subject and object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedTriple {
    pub triple: Triple,
    pub subject_label: String,
    pub relation_label: String,
    pub object_label: String,
    pub subject_description: String,
    pub object_description: String,
}

impl EnrichedTriple {
    /// `subject\tsubject_label\trelation\trelation_label\tobject\tobject_label`
    pub fn labeled_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.triple.subject,
            field(&self.subject_label),
            self.triple.relation,
            field(&self.relation_label),
            self.triple.object,
            field(&self.object_label),
        )
    }

    /// Labeled line followed by both descriptions, matching [DESCRIBED_HEADER].
    pub fn described_line(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.labeled_line(),
            field(&self.subject_description),
            field(&self.object_description),
        )
    }
}

/// Keeps free text on one TSV field.
fn field(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

/// Why a candidate triple was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    MissingLabel,
    MissingDescription,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::MissingLabel => "MISSING_LABEL",
            Reason::MissingDescription => "MISSING_DESCRIPTION",
        }
    }
}

impl FromStr for Reason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MISSING_LABEL" => Ok(Reason::MissingLabel),
            "MISSING_DESCRIPTION" => Ok(Reason::MissingDescription),
            other => Err(Error::Custom(format!("unknown reason code {other:?}"))),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected triple, as written to the failure stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub triple: Triple,
    pub reason: Reason,
}

impl FailureRecord {
    pub fn new(triple: Triple, reason: Reason) -> Self {
        Self { triple, reason }
    }

    /// Parse a `subject\trelation\tobject\treason_code` line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let (triple, reason) = line.rsplit_once('\t')?;
        Some(Self::new(Triple::parse(triple)?, reason.parse().ok()?))
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.triple, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enriched() -> EnrichedTriple {
        EnrichedTriple {
            triple: Triple::new("Q1", "P31", "Q2"),
            subject_label: "universe".to_string(),
            relation_label: "instance of".to_string(),
            object_label: "earth".to_string(),
            subject_description: "All of space.\tAnd time.".to_string(),
            object_description: "Third planet.\nFrom the sun.".to_string(),
        }
    }

    #[test]
    fn parse_triple() {
        assert_eq!(
            Triple::parse("Q1\tP31\tQ2\n"),
            Some(Triple::new("Q1", "P31", "Q2"))
        );
        assert_eq!(Triple::parse("Q1\tP31"), None);
        assert_eq!(Triple::parse("Q1\tP31\tQ2\textra"), None);
        assert_eq!(Triple::parse("Q1\t\tQ2"), None);
        assert_eq!(Triple::parse(""), None);
    }

    #[test]
    fn triple_display() {
        assert_eq!(Triple::new("Q1", "P31", "Q2").to_string(), "Q1\tP31\tQ2");
    }

    #[test]
    fn described_line_has_header_arity() {
        let line = enriched().described_line();
        assert_eq!(
            line.split('\t').count(),
            DESCRIBED_HEADER.split('\t').count()
        );
        assert!(line.ends_with("All of space. And time.\tThird planet. From the sun."));
    }

    #[test]
    fn labeled_line() {
        assert_eq!(
            enriched().labeled_line(),
            "Q1\tuniverse\tP31\tinstance of\tQ2\tearth"
        );
    }

    #[test]
    fn triple_of_enriched_lines() {
        let expected = Some(Triple::new("Q1", "P31", "Q2"));
        assert_eq!(Triple::from_enriched_line(&enriched().labeled_line()), expected);
        assert_eq!(Triple::from_enriched_line(&enriched().described_line()), expected);
        assert_eq!(Triple::from_enriched_line(DESCRIBED_HEADER), None);
        assert_eq!(Triple::from_enriched_line("Q1\tP31\tQ2"), None);
    }

    #[test]
    fn failure_record() {
        let record = FailureRecord::new(Triple::new("Q1", "P31", "Q2"), Reason::MissingLabel);
        let line = record.to_string();
        assert_eq!(line, "Q1\tP31\tQ2\tMISSING_LABEL");
        assert_eq!(FailureRecord::parse(&line), Some(record));
        assert_eq!(FailureRecord::parse("Q1\tP31\tQ2\tOTHER"), None);
    }
}
