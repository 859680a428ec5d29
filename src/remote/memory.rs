//! In-memory knowledge base.
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::{KnowledgeBase, Lookup};
use crate::lang::Lang;

/// Serves labels and summaries from maps and counts every request it receives.
///
/// Keys registered with [MemoryKb::with_transient] always fail with [Lookup::TransientError].
#[derive(Debug, Default)]
pub struct MemoryKb {
    labels: HashMap<(String, Lang), String>,
    summaries: HashMap<(String, Lang), String>,
    transient: HashSet<String>,
    label_calls: Cell<usize>,
    summary_calls: Cell<usize>,
}

impl MemoryKb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, id: &str, lang: Lang, label: &str) -> Self {
        self.labels
            .insert((id.to_string(), lang), label.to_string());
        self
    }

    pub fn with_summary(mut self, title: &str, lang: Lang, summary: &str) -> Self {
        self.summaries
            .insert((title.to_string(), lang), summary.to_string());
        self
    }

    pub fn with_transient(mut self, key: &str) -> Self {
        self.transient.insert(key.to_string());
        self
    }

    /// Number of label requests (one per [KnowledgeBase::labels] call).
    pub fn label_calls(&self) -> usize {
        self.label_calls.get()
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.get()
    }
}

#[async_trait(?Send)]
impl KnowledgeBase for MemoryKb {
    async fn labels(&self, ids: &[String], lang: Lang) -> Vec<Lookup> {
        self.label_calls.set(self.label_calls.get() + 1);
        ids.iter()
            .map(|id| {
                if self.transient.contains(id) {
                    return Lookup::TransientError(format!("{id} unavailable"));
                }
                match self.labels.get(&(id.clone(), lang)) {
                    Some(label) => Lookup::Found(label.clone()),
                    None => Lookup::NotFound,
                }
            })
            .collect()
    }

    async fn summary(&self, title: &str, lang: Lang) -> Lookup {
        self.summary_calls.set(self.summary_calls.get() + 1);
        if self.transient.contains(title) {
            return Lookup::TransientError(format!("{title} unavailable"));
        }
        match self.summaries.get(&(title.to_string(), lang)) {
            Some(summary) => Lookup::Found(summary.clone()),
            None => Lookup::NotFound,
        }
    }
}
