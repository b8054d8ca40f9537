/* ------------------------------------------------------------------ */
/* Tokenizer: whitespace vocabulary + bigram statistics               */
/* ------------------------------------------------------------------ */
//
// Public interface:
//   tokenizer.ingest_text(text)          → intern tokens, count bigrams
//   tokenizer.build_successors()         → argmax label per source token
//   tokenizer.reorder_by_relation()      → see reorder.rs
//   tokenizer.get_token_index(token)     → Option<usize>
//   tokenizer.get_token(idx)             → Option<&str>
//   tokenizer.decode(tokens)             → String
//
// Indices are dense and assigned first-seen. Every text ends with
// END_TOKEN, so no bigram ever spans two texts.

use std::collections::HashMap;

use crate::config::END_TOKEN;
use crate::error::{BigramError, Result};
use crate::transitions::{SuccessorMap, TransitionTable};

// ── Vocabulary ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vocabulary {
    token_to_id: HashMap<String, usize>,
    id_to_token: Vec<String>,
}

impl Vocabulary {
    pub fn new() -> Self { Self::default() }

    /// Tokens given in index order. Fails on duplicates.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        let mut token_to_id = HashMap::with_capacity(tokens.len());
        for (i, tok) in tokens.iter().enumerate() {
            if token_to_id.insert(tok.clone(), i).is_some() {
                return Err(BigramError::corrupt(format!("duplicate token {:?}", tok)));
            }
        }
        Ok(Self { token_to_id, id_to_token: tokens })
    }

    pub fn intern(&mut self, token: &str) -> usize {
        if let Some(&id) = self.token_to_id.get(token) {
            return id;
        }
        let id = self.id_to_token.len();
        self.token_to_id.insert(token.to_string(), id);
        self.id_to_token.push(token.to_string());
        id
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.token_to_id.get(token).copied()
    }

    pub fn lookup(&self, idx: usize) -> Option<&str> {
        self.id_to_token.get(idx).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] { &self.id_to_token }

    pub fn len(&self) -> usize { self.id_to_token.len() }

    pub fn is_empty(&self) -> bool { self.id_to_token.is_empty() }
}

// ── Tokenizer ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tokenizer {
    pub(crate) vocab:       Vocabulary,
    pub(crate) transitions: TransitionTable,
    pub(crate) successors:  SuccessorMap,
    pub(crate) retain_frequencies: bool,
}

impl Default for Tokenizer {
    fn default() -> Self { Self::new() }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            vocab:       Vocabulary::new(),
            transitions: TransitionTable::new(),
            successors:  SuccessorMap::default(),
            retain_frequencies: true,
        }
    }

    /// Reassemble from persisted parts, checking every index is in range.
    pub fn from_parts(
        tokens: Vec<String>,
        transitions: TransitionTable,
        successors: SuccessorMap,
        retain_frequencies: bool,
    ) -> Result<Self> {
        let vocab = Vocabulary::from_tokens(tokens)?;
        let n = vocab.len();
        for (src, row) in transitions.rows() {
            if src >= n || row.keys().any(|&d| d >= n) {
                return Err(BigramError::corrupt(format!("transition row {} out of range for {} tokens", src, n)));
            }
        }
        if successors.pairs().iter().any(|&(s, d)| s >= n || d >= n) {
            return Err(BigramError::corrupt(format!("successor label out of range for {} tokens", n)));
        }
        Ok(Self { vocab, transitions, successors, retain_frequencies })
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    pub fn ingest_text(&mut self, text: &str) {
        let mut words: Vec<&str> = text.split_whitespace().collect();
        words.push(END_TOKEN);

        if words.len() == 1 {
            self.vocab.intern(END_TOKEN);
            return;
        }
        for pair in words.windows(2) {
            let src = self.vocab.intern(pair[0]);
            let dst = self.vocab.intern(pair[1]);
            if self.retain_frequencies {
                self.transitions.record(src, dst);
            }
        }
    }

    pub fn ingest_all<'a>(&mut self, texts: impl IntoIterator<Item = &'a str>) {
        for text in texts { self.ingest_text(text); }
    }

    pub fn build_successors(&mut self) {
        self.successors = SuccessorMap::build(&self.transitions);
    }

    /// Drop the frequency table once labels exist. Disables the
    /// co-occurrence reward and keyword specificity; later ingestion
    /// only grows the vocabulary.
    pub fn discard_frequencies(&mut self) {
        self.transitions = TransitionTable::new();
        self.retain_frequencies = false;
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    pub fn get_token_index(&self, token: &str) -> Option<usize> {
        self.vocab.index_of(token)
    }

    pub fn get_token(&self, idx: usize) -> Option<&str> {
        self.vocab.lookup(idx)
    }

    pub fn count(&self) -> usize { self.vocab.len() }

    pub fn eos_id(&self) -> Option<usize> {
        self.vocab.index_of(END_TOKEN)
    }

    pub fn vocab(&self) -> &Vocabulary { &self.vocab }

    pub fn transitions(&self) -> &TransitionTable { &self.transitions }

    pub fn successors(&self) -> &SuccessorMap { &self.successors }

    pub fn retains_frequencies(&self) -> bool { self.retain_frequencies }

    /// Space-joined tokens, dropping END_TOKEN and unknown indices.
    pub fn decode(&self, tokens: &[usize]) -> String {
        let eos = self.eos_id();
        tokens.iter()
            .filter(|&&id| Some(id) != eos)
            .filter_map(|&id| self.get_token(id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    // Used in the startup log line.
    pub fn sample_tokens(&self, n: usize) -> Vec<String> {
        let cap = n.min(self.count());
        self.vocab.tokens()[..cap].iter().map(|s| format!("{:?}", s)).collect()
    }

    /// Token set, for checks that must ignore index layout.
    #[cfg(test)]
    pub fn token_set(&self) -> std::collections::HashSet<&str> {
        self.vocab.tokens().iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut v = Vocabulary::new();
        assert_eq!(v.intern("a"), 0);
        assert_eq!(v.intern("b"), 1);
        assert_eq!(v.intern("a"), 0);
        assert_eq!(v.len(), 2);
        assert_eq!(v.intern("c"), 2);
        assert_eq!(v.len(), 3);
        assert_eq!(v.lookup(1), Some("b"));
        assert_eq!(v.lookup(3), None);
    }

    #[test]
    fn test_from_tokens_rejects_duplicates() {
        assert!(Vocabulary::from_tokens(vec!["a".into(), "b".into()]).is_ok());
        assert!(Vocabulary::from_tokens(vec!["a".into(), "a".into()]).is_err());
    }

    #[test]
    fn test_minimal_corpus() {
        let mut t = Tokenizer::new();
        t.ingest_text("a b c");
        t.build_successors();

        assert_eq!(t.count(), 4);
        for (i, tok) in ["a", "b", "c", END_TOKEN].iter().enumerate() {
            assert_eq!(t.get_token_index(tok), Some(i));
        }
        let row_a = t.transitions().row(0).unwrap();
        assert_eq!(row_a.len(), 1);
        assert_eq!(row_a.get(&1), Some(&1));

        assert_eq!(t.successors().get(0), Some(1));
        assert_eq!(t.successors().get(1), Some(2));
        assert_eq!(t.successors().get(2), Some(3));
        assert_eq!(t.successors().get(3), None);
    }

    #[test]
    fn test_repeated_bigram() {
        let mut t = Tokenizer::new();
        t.ingest_all(["a b", "a c", "a b"]);
        t.build_successors();

        let a = t.get_token_index("a").unwrap();
        let b = t.get_token_index("b").unwrap();
        let c = t.get_token_index("c").unwrap();
        assert_eq!(t.transitions().count(a, b), 2);
        assert_eq!(t.transitions().count(a, c), 1);
        assert_eq!(t.successors().get(a), Some(b));
    }

    #[test]
    fn test_row_total_matches_left_occurrences() {
        let texts = ["the cat sat", "the dog", "a cat and the cat"];
        let mut t = Tokenizer::new();
        t.ingest_all(texts);

        let the = t.get_token_index("the").unwrap();
        let cat = t.get_token_index("cat").unwrap();
        // "the" is left of a pair 3 times, "cat" 3 times (sat, and, EOT).
        assert_eq!(t.transitions().row_total(the), 3);
        assert_eq!(t.transitions().row_total(cat), 3);

        let pairs: usize = texts.iter().map(|s| s.split_whitespace().count()).sum();
        assert_eq!(t.transitions().total(), pairs as u64);
    }

    #[test]
    fn test_end_token_breaks_cross_text_transitions() {
        let mut t = Tokenizer::new();
        t.ingest_all(["x y", "z w"]);
        let y = t.get_token_index("y").unwrap();
        let z = t.get_token_index("z").unwrap();
        assert_eq!(t.transitions().count(y, z), 0);
        assert_eq!(t.transitions().count(y, t.eos_id().unwrap()), 1);
    }

    #[test]
    fn test_empty_text_yields_only_end_token() {
        let mut t = Tokenizer::new();
        t.ingest_text("");
        t.ingest_text("   ");
        assert_eq!(t.count(), 1);
        assert_eq!(t.eos_id(), Some(0));
        assert!(t.transitions().is_empty());
    }

    #[test]
    fn test_whitespace_runs_do_not_create_empty_tokens() {
        let mut t = Tokenizer::new();
        t.ingest_text("a   b\tc\n");
        assert_eq!(t.count(), 4);
        assert!(t.get_token_index("").is_none());
    }

    #[test]
    fn test_discard_frequencies_keeps_labels() {
        let mut t = Tokenizer::new();
        t.ingest_text("a b");
        t.build_successors();
        t.discard_frequencies();
        assert!(t.transitions().is_empty());
        assert_eq!(t.successors().get(0), Some(1));

        t.ingest_text("q r");
        assert_eq!(t.count(), 5);
        assert!(t.transitions().is_empty());
    }

    #[test]
    fn test_decode_skips_end_token() {
        let mut t = Tokenizer::new();
        t.ingest_text("hello world");
        let eos = t.eos_id().unwrap();
        assert_eq!(t.decode(&[0, 1, eos]), "hello world");
        assert_eq!(t.decode(&[1, 99]), "world");
    }

    #[test]
    fn test_from_parts_validates_ranges() {
        let mut table = TransitionTable::new();
        table.record(0, 5);
        let err = Tokenizer::from_parts(vec!["a".into(), "b".into()], table, SuccessorMap::default(), true);
        assert!(err.is_err());

        let ok = Tokenizer::from_parts(
            vec!["a".into(), "b".into()],
            TransitionTable::new(),
            SuccessorMap::from_pairs([(0, 1)]),
            false,
        ).unwrap();
        assert_eq!(ok.successors().get(0), Some(1));
        assert!(!ok.retains_frequencies());
    }
}
