/*! Remote lookups

Labels and summaries come from a [KnowledgeBase]. The production one is [Wikidata],
which queries the Wikidata entity API for labels and the Wikipedia REST API for summaries.
[MemoryKb] serves the same lookups from memory.

Every outbound request goes through a [Gate], which caps the number of requests in flight.
!*/
mod gate;
mod memory;
mod wikidata;

pub use gate::Gate;
pub use memory::MemoryKb;
pub use wikidata::Wikidata;

use async_trait::async_trait;

use crate::lang::Lang;

/// Outcome of a single remote lookup.
///
/// [Lookup::Found] and [Lookup::NotFound] are definitive and can be cached.
/// [Lookup::TransientError] means the lookup failed and should be retried later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
    TransientError(String),
}

impl Lookup {
    /// Build a lookup from a cached value. Empty values count as absent.
    pub fn from_cached(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Lookup::Found(v.to_string()),
            _ => Lookup::NotFound,
        }
    }

    /// Value to cache, if the outcome is definitive.
    pub fn cacheable(&self) -> Option<Option<&str>> {
        match self {
            Lookup::Found(v) => Some(Some(v.as_str())),
            Lookup::NotFound => Some(None),
            Lookup::TransientError(_) => None,
        }
    }

    /// Downgrade a found value that `accept` rejects to [Lookup::NotFound].
    pub fn require(self, accept: impl Fn(&str) -> bool) -> Self {
        match self {
            Lookup::Found(v) if !accept(&v) => Lookup::NotFound,
            other => other,
        }
    }
}

/// Source of entity labels and free-text summaries.
///
/// The sampler runs on a single-threaded runtime, so returned futures need not be [Send].
#[async_trait(?Send)]
pub trait KnowledgeBase {
    /// Labels of `ids` in `lang`. The result is aligned with `ids`.
    async fn labels(&self, ids: &[String], lang: Lang) -> Vec<Lookup>;

    /// Summary of the page titled `title` in `lang`.
    async fn summary(&self, title: &str, lang: Lang) -> Lookup;

    /// Labels of a single id in several languages, aligned with `langs`.
    async fn labels_in(&self, id: &str, langs: &[Lang]) -> Vec<Lookup> {
        let ids = [id.to_string()];
        let mut lookups = Vec::with_capacity(langs.len());
        for lang in langs {
            let lookup = self.labels(&ids, *lang).await.pop();
            lookups.push(lookup.unwrap_or_else(|| {
                Lookup::TransientError(format!("no label result for {id}"))
            }));
        }
        lookups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_values() {
        assert_eq!(Lookup::from_cached(Some("x")), Lookup::Found("x".to_string()));
        assert_eq!(Lookup::from_cached(Some("")), Lookup::NotFound);
        assert_eq!(Lookup::from_cached(None), Lookup::NotFound);
    }

    #[test]
    fn transient_is_not_cacheable() {
        assert_eq!(Lookup::TransientError("timeout".into()).cacheable(), None);
        assert_eq!(Lookup::NotFound.cacheable(), Some(None));
        assert_eq!(Lookup::Found("a".into()).cacheable(), Some(Some("a")));
    }

    #[test]
    fn require_downgrades() {
        let short = Lookup::Found("One sentence.".into()).require(|t| t.matches('.').count() >= 2);
        assert_eq!(short, Lookup::NotFound);
        let err = Lookup::TransientError("x".into()).require(|_| false);
        assert!(matches!(err, Lookup::TransientError(_)));
    }
}
