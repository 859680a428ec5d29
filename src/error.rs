//! Error enum
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Reqwest(reqwest::Error),
    Url(url::ParseError),
    Serde(serde_json::Error),
    Csv(csv::Error),
    Glob(glob::GlobError),
    GlobPattern(glob::PatternError),
    ParseInt(ParseIntError),
    UnknownLang(String),
    /// A required input file does not exist.
    MissingFile(PathBuf),
    /// Rebalanced quotas do not sum to the configured target.
    QuotaMismatch { expected: u64, got: u64 },
    /// Invalid chunk index/count pair.
    Chunk { index: usize, count: usize },
    Custom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Reqwest(e) => write!(f, "http error: {e}"),
            Error::Url(e) => write!(f, "invalid url: {e}"),
            Error::Serde(e) => write!(f, "json error: {e}"),
            Error::Csv(e) => write!(f, "tsv error: {e}"),
            Error::Glob(e) => write!(f, "glob error: {e}"),
            Error::GlobPattern(e) => write!(f, "invalid glob pattern: {e}"),
            Error::ParseInt(e) => write!(f, "invalid integer: {e}"),
            Error::UnknownLang(l) => write!(f, "unsupported language: {l}"),
            Error::MissingFile(p) => write!(f, "file not found: {}", p.display()),
            Error::QuotaMismatch { expected, got } => write!(
                f,
                "quota rebalance failed: quotas sum to {got}, expected {expected}"
            ),
            Error::Chunk { index, count } => {
                write!(f, "invalid chunk {index} for a chunk count of {count}")
            }
            Error::Custom(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Error {
        Error::Reqwest(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Error {
        Error::Url(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Error {
        Error::Csv(e)
    }
}

impl From<glob::GlobError> for Error {
    fn from(e: glob::GlobError) -> Error {
        Error::Glob(e)
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Error {
        Error::GlobPattern(e)
    }
}

impl From<ParseIntError> for Error {
    fn from(e: ParseIntError) -> Error {
        Error::ParseInt(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
