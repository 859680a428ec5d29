//! Relation to chunk assignment.
//!
//! Relations are sorted, and the relation at position `k` belongs to chunk `k mod count`.
//! The assignment only depends on the relation set and on the chunk count,
//! so a given chunk always gets the same relations back.
use crate::error::Error;

/// A worker's slice of the relation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    count: usize,
}

impl Chunk {
    /// Fails unless `index < count`.
    pub fn new(index: usize, count: usize) -> Result<Self, Error> {
        if index >= count {
            return Err(Error::Chunk { index, count });
        }
        Ok(Self { index, count })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether the relation at sorted position `position` belongs to this chunk.
    pub fn owns(&self, position: usize) -> bool {
        position % self.count == self.index
    }
}

/// Relations of `relations` owned by `chunk`, sorted.
pub fn partition<'a>(relations: impl IntoIterator<Item = &'a str>, chunk: Chunk) -> Vec<String> {
    let mut sorted: Vec<&str> = relations.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .into_iter()
        .enumerate()
        .filter(|(position, _)| chunk.owns(*position))
        .map(|(_, relation)| relation.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn relations(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("P{i}")).collect()
    }

    #[test]
    fn invalid_chunks() {
        assert!(matches!(
            Chunk::new(0, 0),
            Err(Error::Chunk { index: 0, count: 0 })
        ));
        assert!(Chunk::new(3, 3).is_err());
        assert!(Chunk::new(2, 3).is_ok());
    }

    #[test]
    fn round_robin_on_sorted_ids() {
        let rels = ["P31", "P17", "P106", "P27"];
        let chunk = Chunk::new(1, 2).unwrap();
        // sorted: P106, P17, P27, P31
        assert_eq!(partition(rels, chunk), vec!["P17", "P31"]);
    }

    #[test]
    fn disjoint_and_complete() {
        let rels = relations(53);
        let all: HashSet<&str> = rels.iter().map(String::as_str).collect();
        for count in 1..9 {
            let mut seen = HashSet::new();
            for index in 0..count {
                let chunk = Chunk::new(index, count).unwrap();
                for r in partition(rels.iter().map(String::as_str), chunk) {
                    assert!(seen.insert(r), "relation assigned twice");
                }
            }
            let seen: HashSet<&str> = seen.iter().map(String::as_str).collect();
            assert_eq!(seen, all);
        }
    }

    #[test]
    fn stable_across_calls() {
        let rels = relations(20);
        let chunk = Chunk::new(2, 4).unwrap();
        let mut shuffled = rels.clone();
        shuffled.reverse();
        assert_eq!(
            partition(rels.iter().map(String::as_str), chunk),
            partition(shuffled.iter().map(String::as_str), chunk)
        );
    }
}
