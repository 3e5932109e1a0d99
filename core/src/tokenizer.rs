use std::collections::HashMap;

/// Bag-of-words multiset: term -> occurrence count within one document.
pub type TermBag = HashMap<String, u64>;

/// Split `text` on single space characters into a term bag.
///
/// Consecutive spaces produce no empty terms. No case folding, stemming, or
/// punctuation handling: a token is whatever sits between spaces.
pub fn term_bag(text: &str) -> TermBag {
    let mut bag = TermBag::new();
    for token in text.split(' ') {
        if token.is_empty() {
            continue;
        }
        *bag.entry(token.to_string()).or_insert(0) += 1;
    }
    bag
}

/// Total number of tokens in a bag (the sum of all counts).
pub fn total_terms(bag: &TermBag) -> u64 {
    bag.values().sum()
}
