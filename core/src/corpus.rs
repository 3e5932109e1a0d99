use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use parking_lot::RwLock;
use serde::Serialize;

use crate::tokenizer::{self, TermBag};

pub type DocId = u64;

/// One ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub text: String,
}

struct StoredDoc {
    text: String,
    bag: TermBag,
    /// Sum of all counts in `bag`, cached so tf never re-sums.
    total_terms: u64,
}

/// Ranking order: higher score first, ascending doc id among equal scores.
#[derive(Debug, Clone, Copy)]
struct RankedDoc {
    score: f64,
    doc_id: DocId,
}

impl Ord for RankedDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        // Scores are finite: tf and idf are both guarded against zero
        // denominators, so partial_cmp never sees a NaN.
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

impl PartialOrd for RankedDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedDoc {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedDoc {}

#[derive(Default)]
struct CorpusInner {
    docs: HashMap<DocId, StoredDoc>,
    /// Inverted index: term -> ids of the documents containing it. A posting
    /// set is removed outright the moment it becomes empty.
    postings: HashMap<String, HashSet<DocId>>,
}

impl CorpusInner {
    fn insert(&mut self, doc_id: DocId, text: &str) -> bool {
        if text.is_empty() {
            tracing::debug!(doc_id, "add rejected: empty text");
            return false;
        }
        if self.docs.contains_key(&doc_id) {
            tracing::debug!(doc_id, "add rejected: duplicate id");
            return false;
        }

        let bag = tokenizer::term_bag(text);
        let total_terms = tokenizer::total_terms(&bag);
        for term in bag.keys() {
            self.postings.entry(term.clone()).or_default().insert(doc_id);
        }
        self.docs.insert(
            doc_id,
            StoredDoc {
                text: text.to_string(),
                bag,
                total_terms,
            },
        );
        true
    }

    fn remove(&mut self, doc_id: DocId) -> bool {
        let Some(doc) = self.docs.remove(&doc_id) else {
            tracing::debug!(doc_id, "delete rejected: unknown id");
            return false;
        };
        for term in doc.bag.keys() {
            if let Some(ids) = self.postings.get_mut(term) {
                ids.remove(&doc_id);
                if ids.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
        true
    }

    /// Score every stored document against `query_bag` and return the best
    /// `min(n, corpus size)`, most relevant first.
    fn rank(&self, query_bag: &TermBag, n: usize) -> Vec<RankedDoc> {
        let corpus_size = self.docs.len();
        if corpus_size == 0 || n == 0 {
            return Vec::new();
        }

        // idf(term) = log10(corpus size / docs containing term). A term absent
        // from the corpus keeps a denominator of 1, so idf stays finite.
        let idf: Vec<(&str, f64)> = query_bag
            .keys()
            .map(|term| {
                let df = self.postings.get(term).map_or(0, HashSet::len).max(1);
                (term.as_str(), (corpus_size as f64 / df as f64).log10())
            })
            .collect();

        // Bounded min-heap: push every document, pop the current worst
        // whenever the heap grows past n. The heap never holds more than
        // min(n, corpus size) + 1 entries, so clamp the preallocation too —
        // the caller's n can be arbitrarily large.
        let mut heap: BinaryHeap<Reverse<RankedDoc>> =
            BinaryHeap::with_capacity(n.min(corpus_size) + 1);
        for (&doc_id, doc) in &self.docs {
            let mut score = 0.0;
            for &(term, term_idf) in &idf {
                if let Some(&count) = doc.bag.get(term) {
                    score += count as f64 / doc.total_terms as f64 * term_idf;
                }
            }
            heap.push(Reverse(RankedDoc { score, doc_id }));
            if heap.len() > n {
                heap.pop();
            }
        }

        // Ascending order over Reverse<RankedDoc> is best-first over RankedDoc.
        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse(doc)| doc)
            .collect()
    }
}

/// In-memory document corpus with TF-IDF relevance search.
///
/// All state sits behind one readers-writer lock: lookups and searches take
/// the shared side, every mutation takes the exclusive side for its full
/// duration, so no reader ever observes a partially updated index.
pub struct Corpus {
    inner: RwLock<CorpusInner>,
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CorpusInner::default()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().docs.is_empty()
    }

    /// Stored text for `doc_id`, if present. Never fails.
    pub fn get_document(&self, doc_id: DocId) -> Option<String> {
        self.inner.read().docs.get(&doc_id).map(|doc| doc.text.clone())
    }

    /// Store a new document and index every term in it.
    ///
    /// Returns false, with no effect, when `text` is empty or `doc_id` is
    /// already present.
    pub fn add_document(&self, doc_id: DocId, text: &str) -> bool {
        self.inner.write().insert(doc_id, text)
    }

    /// Remove a document and un-index every term in it.
    ///
    /// Returns false, with no effect, when `doc_id` is not present.
    pub fn delete_document(&self, doc_id: DocId) -> bool {
        self.inner.write().remove(doc_id)
    }

    /// Replace a document's text, holding one exclusive section across both
    /// phases so readers never see the document absent mid-update.
    ///
    /// Fails if `doc_id` is not present. Replacement is remove-then-insert:
    /// when the insert is rejected (empty `text`), the document stays removed
    /// and the call returns false.
    pub fn update_document(&self, doc_id: DocId, text: &str) -> bool {
        let mut inner = self.inner.write();
        if !inner.remove(doc_id) {
            return false;
        }
        inner.insert(doc_id, text)
    }

    /// Update when `doc_id` exists, add otherwise, in one exclusive section.
    pub fn add_or_update_document(&self, doc_id: DocId, text: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.docs.contains_key(&doc_id) {
            inner.remove(doc_id);
        }
        inner.insert(doc_id, text)
    }

    /// Rank every stored document against `query` by TF-IDF and return the
    /// texts of the best `min(n, corpus size)`, most relevant first.
    ///
    /// Equal scores rank by ascending document id, so results are fully
    /// deterministic for an unmodified corpus.
    pub fn search_query(&self, query: &str, n: usize) -> Vec<String> {
        self.search_top(query, n)
            .into_iter()
            .map(|hit| hit.text)
            .collect()
    }

    /// Like [`Corpus::search_query`] but keeps the id and score of each hit.
    pub fn search_top(&self, query: &str, n: usize) -> Vec<SearchHit> {
        let inner = self.inner.read();
        let query_bag = tokenizer::term_bag(query);
        inner
            .rank(&query_bag, n)
            .into_iter()
            .filter_map(|ranked| {
                inner.docs.get(&ranked.doc_id).map(|doc| SearchHit {
                    doc_id: ranked.doc_id,
                    score: ranked.score,
                    text: doc.text.clone(),
                })
            })
            .collect()
    }
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_sets_track_membership() {
        let corpus = Corpus::new();
        assert!(corpus.add_document(7, "green dog"));
        {
            let inner = corpus.inner.read();
            assert!(inner.postings["green"].contains(&7));
            assert!(inner.postings["dog"].contains(&7));
        }
        assert!(corpus.delete_document(7));
        let inner = corpus.inner.read();
        assert!(inner.postings.is_empty());
        assert!(inner.docs.is_empty());
    }

    #[test]
    fn empty_posting_sets_are_pruned() {
        let corpus = Corpus::new();
        assert!(corpus.add_document(0, "happy day"));
        assert!(corpus.add_document(1, "happy"));
        assert!(corpus.delete_document(1));
        let inner = corpus.inner.read();
        assert_eq!(inner.postings.len(), 2);
        assert_eq!(inner.postings["happy"].len(), 1);
        assert!(inner.postings["happy"].contains(&0));
        assert!(inner.postings["day"].contains(&0));
    }

    #[test]
    fn index_is_exact_transpose_of_bags() {
        let corpus = Corpus::new();
        assert!(corpus.add_document(0, "happy day"));
        assert!(corpus.add_document(1, "have a nice day"));
        assert!(corpus.update_document(0, "a green green day"));
        assert!(corpus.delete_document(1));

        let inner = corpus.inner.read();
        for (doc_id, doc) in &inner.docs {
            for term in doc.bag.keys() {
                assert!(
                    inner.postings[term].contains(doc_id),
                    "missing posting for {term:?}"
                );
            }
        }
        for (term, ids) in &inner.postings {
            assert!(!ids.is_empty(), "empty posting set for {term:?}");
            for doc_id in ids {
                assert!(
                    inner.docs[doc_id].bag.contains_key(term),
                    "orphaned posting for {term:?}"
                );
            }
        }
    }

    #[test]
    fn total_terms_matches_bag_sum() {
        let corpus = Corpus::new();
        assert!(corpus.add_document(3, "have a nice day day"));
        let inner = corpus.inner.read();
        let doc = &inner.docs[&3];
        assert_eq!(doc.total_terms, 5);
        assert_eq!(doc.total_terms, doc.bag.values().sum::<u64>());
    }

    #[test]
    fn update_reindexes_old_and_new_terms() {
        let corpus = Corpus::new();
        assert!(corpus.add_document(0, "happy day"));
        assert!(corpus.update_document(0, "green dog"));
        let inner = corpus.inner.read();
        assert!(!inner.postings.contains_key("happy"));
        assert!(!inner.postings.contains_key("day"));
        assert!(inner.postings["green"].contains(&0));
        assert!(inner.postings["dog"].contains(&0));
    }

    #[test]
    fn ranking_order_totals_score_then_id() {
        let better = RankedDoc { score: 1.0, doc_id: 9 };
        let worse = RankedDoc { score: 0.5, doc_id: 1 };
        assert!(better > worse);

        // equal scores: lower id ranks higher
        let low = RankedDoc { score: 0.5, doc_id: 1 };
        let high = RankedDoc { score: 0.5, doc_id: 2 };
        assert!(low > high);
        assert_eq!(low.cmp(&low), Ordering::Equal);
    }
}
