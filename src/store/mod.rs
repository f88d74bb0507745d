use std::collections::HashMap;

use crate::models::Token;

/// Field-wise merge of a batch of tokens into an existing map. Returns a
/// fresh map so callers can rely on cheap change detection; the input map is
/// untouched. Incoming records win per field ("last write wins"), with no
/// freshness comparison between sources. Nothing is ever evicted: the map
/// grows for the lifetime of the session.
pub fn merge(
    existing: &HashMap<String, Token>,
    incoming: &[Token],
) -> HashMap<String, Token> {
    let mut merged = existing.clone();
    for token in incoming {
        match merged.get_mut(&token.address) {
            Some(current) => current.overwrite_with(token),
            None => {
                merged.insert(token.address.clone(), token.clone());
            }
        }
    }
    merged
}

impl Token {
    /// Shallow field overwrite. `created_at` is the only optional field and
    /// is preserved when the incoming record does not know it, matching the
    /// object-spread semantics the merge contract requires.
    fn overwrite_with(&mut self, incoming: &Token) {
        let created_at = incoming
            .created_at
            .clone()
            .or_else(|| self.created_at.take());
        *self = incoming.clone();
        self.created_at = created_at;
    }
}

/// Process-wide map of token address → most recently merged record. Owned by
/// the top-level dashboard; panels publish into it through callbacks and
/// never hold the canonical map themselves.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: HashMap<String, Token>,
    generation: u64,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a batch and bumps the generation counter, even for an empty
    /// batch: dependents key re-computation off the counter, and an empty
    /// merge is still a completed poll.
    pub fn publish(&mut self, incoming: &[Token]) {
        self.tokens = merge(&self.tokens, incoming);
        self.generation += 1;
    }

    pub fn get(&self, address: &str) -> Option<&Token> {
        self.tokens.get(address)
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.tokens.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(address: &str, price: f64, created_at: Option<&str>) -> Token {
        Token {
            address: address.to_string(),
            name: format!("{}-name", address),
            ticker: address.to_uppercase(),
            price,
            change24h: 1.0,
            image_url: String::new(),
            pair_address: format!("{}-pool", address),
            created_at: created_at.map(str::to_string),
        }
    }

    #[test]
    fn merge_inserts_new_addresses() {
        let existing = HashMap::new();
        let merged = merge(&existing, &[token("a", 1.0, None), token("b", 2.0, None)]);
        assert_eq!(merged.len(), 2);
        assert!(existing.is_empty());
    }

    #[test]
    fn merge_is_left_fold_last_write_wins() {
        let mut map = HashMap::new();
        map = merge(&map, &[token("a", 1.0, Some("t0"))]);
        map = merge(&map, &[token("a", 2.0, Some("t1"))]);
        map = merge(&map, &[token("a", 3.0, Some("t2"))]);
        let a = &map["a"];
        assert_eq!(a.price, 3.0);
        assert_eq!(a.created_at.as_deref(), Some("t2"));
    }

    #[test]
    fn merge_preserves_created_at_absent_from_incoming() {
        let mut map = HashMap::new();
        map = merge(&map, &[token("a", 1.0, Some("2024-05-01T00:00:00Z"))]);
        map = merge(&map, &[token("a", 9.0, None)]);
        let a = &map["a"];
        assert_eq!(a.price, 9.0);
        assert_eq!(a.created_at.as_deref(), Some("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn merge_same_batch_order_decides() {
        let map = merge(
            &HashMap::new(),
            &[token("a", 1.0, None), token("a", 5.0, None)],
        );
        assert_eq!(map["a"].price, 5.0);
    }

    #[test]
    fn merge_empty_batch_is_a_noop() {
        let mut map = HashMap::new();
        map = merge(&map, &[token("a", 1.0, None)]);
        let merged = merge(&map, &[]);
        assert_eq!(merged, map);
    }

    #[test]
    fn store_generation_advances_per_publish() {
        let mut store = TokenStore::new();
        assert_eq!(store.generation(), 0);
        store.publish(&[token("a", 1.0, None)]);
        store.publish(&[]);
        assert_eq!(store.generation(), 2);
        assert_eq!(store.len(), 1);
    }
}
