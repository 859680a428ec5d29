//! Output file naming.
//!
//! For a language `L`, files are named `<prefix>_L_<tag><stream>_part<i>.tsv` for chunk `i`,
//! and `<prefix>_L_<tag><stream>.tsv` once merged, `<stream>` being one of
//! `""`, `_labels`, `_descriptions` or `_FAILED`.
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::debug;

use crate::error::Error;
use crate::lang::Lang;

/// The four parallel output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Triples,
    Labels,
    Descriptions,
    Failed,
}

impl Stream {
    pub const ALL: [Stream; 4] = [
        Stream::Triples,
        Stream::Labels,
        Stream::Descriptions,
        Stream::Failed,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            Stream::Triples => "",
            Stream::Labels => "_labels",
            Stream::Descriptions => "_descriptions",
            Stream::Failed => "_FAILED",
        }
    }

    /// Only the described stream starts with a header line.
    pub fn has_header(&self) -> bool {
        matches!(self, Stream::Descriptions)
    }
}

/// Paths of the four streams, either of one chunk or merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPaths {
    pub triples: PathBuf,
    pub labels: PathBuf,
    pub descriptions: PathBuf,
    pub failed: PathBuf,
}

impl StreamPaths {
    pub fn get(&self, stream: Stream) -> &Path {
        match stream {
            Stream::Triples => &self.triples,
            Stream::Labels => &self.labels,
            Stream::Descriptions => &self.descriptions,
            Stream::Failed => &self.failed,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stream, &Path)> {
        Stream::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

/// Naming scheme of the files of one language in one directory.
#[derive(Debug, Clone)]
pub struct Layout {
    dir: PathBuf,
    base: String,
}

impl Layout {
    pub const DEFAULT_PREFIX: &'static str = "wikidata5m_top200";
    pub const DEFAULT_TAG: &'static str = "60k";

    pub fn new(dir: &Path, prefix: &str, lang: Lang, tag: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            base: format!("{prefix}_{lang}_{tag}"),
        }
    }

    fn stem(&self, stream: Stream) -> String {
        format!("{}{}", self.base, stream.suffix())
    }

    pub fn merged(&self, stream: Stream) -> PathBuf {
        self.dir.join(format!("{}.tsv", self.stem(stream)))
    }

    pub fn part(&self, stream: Stream, chunk: usize) -> PathBuf {
        self.dir
            .join(format!("{}_part{}.tsv", self.stem(stream), chunk))
    }

    pub fn chunk_paths(&self, chunk: usize) -> StreamPaths {
        StreamPaths {
            triples: self.part(Stream::Triples, chunk),
            labels: self.part(Stream::Labels, chunk),
            descriptions: self.part(Stream::Descriptions, chunk),
            failed: self.part(Stream::Failed, chunk),
        }
    }

    pub fn merged_paths(&self) -> StreamPaths {
        StreamPaths {
            triples: self.merged(Stream::Triples),
            labels: self.merged(Stream::Labels),
            descriptions: self.merged(Stream::Descriptions),
            failed: self.merged(Stream::Failed),
        }
    }

    /// Chunk index of a part file of `stream`, if `path` is one.
    fn part_index(&self, stream: Stream, path: &Path) -> Option<usize> {
        let prefix = format!("{}_part", self.stem(stream));
        path.file_name()?
            .to_str()?
            .strip_prefix(&prefix)?
            .strip_suffix(".tsv")?
            .parse()
            .ok()
    }

    /// Existing part files of `stream`, ordered by chunk index.
    pub fn parts(&self, stream: Stream) -> Result<Vec<(usize, PathBuf)>, Error> {
        let dir = self
            .dir
            .to_str()
            .ok_or_else(|| Error::Custom(format!("invalid directory: {:?}", self.dir)))?;
        let pattern = format!(
            "{}/{}_part*.tsv",
            Pattern::escape(dir),
            Pattern::escape(&self.stem(stream))
        );
        debug!("looking for parts matching {}", pattern);

        let mut parts = Vec::new();
        for path in glob::glob(&pattern)? {
            let path = path?;
            if let Some(index) = self.part_index(stream, &path) {
                parts.push((index, path));
            }
        }
        parts.sort_by_key(|(index, _)| *index);
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn names() {
        let layout = Layout::new(Path::new("out"), "wikidata5m_top200", Lang::Ru, "60k");
        assert_eq!(
            layout.part(Stream::Triples, 3),
            Path::new("out/wikidata5m_top200_ru_60k_part3.tsv")
        );
        assert_eq!(
            layout.part(Stream::Failed, 0),
            Path::new("out/wikidata5m_top200_ru_60k_FAILED_part0.tsv")
        );
        assert_eq!(
            layout.merged(Stream::Descriptions),
            Path::new("out/wikidata5m_top200_ru_60k_descriptions.tsv")
        );
    }

    #[test]
    fn parts_are_ordered_numerically() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), "kg", Lang::En, "1k");
        for i in [10, 2, 0, 1] {
            std::fs::write(layout.part(Stream::Triples, i), "").unwrap();
        }
        std::fs::write(layout.part(Stream::Labels, 5), "").unwrap();
        std::fs::write(layout.merged(Stream::Triples), "").unwrap();

        let indices: Vec<usize> = layout
            .parts(Stream::Triples)
            .unwrap()
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 10]);

        let labels = layout.parts(Stream::Labels).unwrap();
        assert_eq!(labels.len(), 1);
        assert!(layout.parts(Stream::Failed).unwrap().is_empty());
    }
}
