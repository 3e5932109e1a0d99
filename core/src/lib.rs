//! In-memory TF-IDF document corpus: a bag-of-words tokenizer, an inverted
//! index, and ranked relevance search behind a single readers-writer lock.

pub mod corpus;
pub mod tokenizer;

pub use corpus::{Corpus, DocId, SearchHit};
pub use tokenizer::{term_bag, total_terms, TermBag};
