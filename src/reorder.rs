/* ------------------------------------------------------------------ */
/* Relation-based re-indexing of the vocabulary                      */
/* ------------------------------------------------------------------ */
//
// Each token with recorded successors gets a centrality score: the
// frequency-weighted mean of its successors' indices (integer division).
// Tokens without successors score usize::MAX. All tokens are then sorted
// by (score, text) and renumbered by rank, so tokens that lead to the
// same neighbourhood end up at nearby indices.
//
// Vocabulary, frequency table and successor map are built fresh and
// swapped in with one assignment; a half-rebuilt tokenizer is never
// reachable.

use tracing::debug;

use crate::tokenizer::{Tokenizer, Vocabulary};
use crate::transitions::{SuccessorMap, TransitionTable};

fn centrality_scores(table: &TransitionTable, n: usize) -> Vec<usize> {
    let mut scores = vec![usize::MAX; n];
    for (src, row) in table.rows() {
        let mut weighted: u128 = 0;
        let mut total: u128 = 0;
        for (&dst, &count) in row {
            weighted += dst as u128 * count as u128;
            total += count as u128;
        }
        if total > 0 && src < n {
            scores[src] = (weighted / total) as usize;
        }
    }
    scores
}

impl Tokenizer {
    pub fn reorder_by_relation(&mut self) {
        let n = self.count();
        if n < 2 { return; }

        let scores = centrality_scores(&self.transitions, n);
        let tokens = self.vocab.tokens();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            scores[a].cmp(&scores[b]).then_with(|| tokens[a].cmp(&tokens[b]))
        });

        // remap[old] = new
        let mut remap = vec![0usize; n];
        for (new_idx, &old_idx) in order.iter().enumerate() {
            remap[old_idx] = new_idx;
        }

        let new_tokens: Vec<String> = order.iter().map(|&old| tokens[old].clone()).collect();
        let vocab = match Vocabulary::from_tokens(new_tokens) {
            Ok(v) => v,
            // Unreachable: a permutation of a valid vocabulary has no duplicates.
            Err(_) => return,
        };
        let transitions = self.transitions.remapped(&remap);

        // Labels that were already built follow the new layout. With the
        // table still around they are rebuilt so the lowest-index tie rule
        // holds in the new index space; otherwise they are carried over.
        let successors = if self.successors.is_empty() {
            SuccessorMap::default()
        } else if !transitions.is_empty() {
            SuccessorMap::build(&transitions)
        } else {
            SuccessorMap::from_pairs(
                self.successors.pairs().into_iter().map(|(s, d)| (remap[s], remap[d])),
            )
        };

        let moved = remap.iter().enumerate().filter(|(old, new)| old != *new).count();
        debug!("reorder: {} of {} tokens moved", moved, n);

        *self = Tokenizer {
            vocab,
            transitions,
            successors,
            retain_frequencies: self.retain_frequencies,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::END_TOKEN;

    fn transitions_by_text(t: &Tokenizer) -> Vec<(String, String, u64)> {
        let mut out = Vec::new();
        for (src, row) in t.transitions().rows() {
            for (&dst, &count) in row {
                out.push((
                    t.get_token(src).unwrap().to_string(),
                    t.get_token(dst).unwrap().to_string(),
                    count,
                ));
            }
        }
        out.sort();
        out
    }

    #[test]
    fn test_reorder_is_a_permutation() {
        let mut t = Tokenizer::new();
        t.ingest_all([
            "the quick brown fox",
            "the lazy dog sleeps",
            "a quick dog runs",
            "brown dog and the fox",
        ]);
        t.build_successors();

        let before_set: Vec<String> = {
            let mut v: Vec<String> = t.token_set().into_iter().map(String::from).collect();
            v.sort();
            v
        };
        let before_count = t.count();
        let before_pairs = transitions_by_text(&t);

        t.reorder_by_relation();

        let mut after_set: Vec<String> = t.token_set().into_iter().map(String::from).collect();
        after_set.sort();
        assert_eq!(after_set, before_set);
        assert_eq!(t.count(), before_count);
        assert_eq!(transitions_by_text(&t), before_pairs);

        for i in 0..t.count() {
            let tok = t.get_token(i).unwrap().to_string();
            assert_eq!(t.get_token_index(&tok), Some(i));
        }
    }

    #[test]
    fn test_reorder_sorts_by_score_then_text() {
        let mut t = Tokenizer::new();
        // z=0, a=1, EOT=2. z → {a}: score 1. a → {EOT, z}: (2 + 0) / 2 = 1.
        t.ingest_all(["z a", "a z"]);
        t.reorder_by_relation();

        assert_eq!(t.get_token_index("a"), Some(0));
        assert_eq!(t.get_token_index("z"), Some(1));
        assert_eq!(t.get_token_index(END_TOKEN), Some(2));
        // z → a was 0 → 1, now 1 → 0.
        assert_eq!(t.transitions().count(1, 0), 1);
    }

    #[test]
    fn test_tokens_without_successors_go_last() {
        let mut t = Tokenizer::new();
        t.ingest_text("b a");
        t.reorder_by_relation();
        assert_eq!(t.get_token_index(END_TOKEN), Some(t.count() - 1));
    }

    #[test]
    fn test_reorder_rebuilds_successors() {
        let mut t = Tokenizer::new();
        t.ingest_all(["x y", "x y", "x w", "y x"]);
        t.build_successors();
        t.reorder_by_relation();

        let x = t.get_token_index("x").unwrap();
        let y = t.get_token_index("y").unwrap();
        assert_eq!(t.successors().get(x), Some(y));
        assert_eq!(t.successors(), &SuccessorMap::build(t.transitions()));
    }

    #[test]
    fn test_reorder_carries_labels_without_frequencies() {
        let mut t = Tokenizer::new();
        t.ingest_all(["z a", "a z"]);
        t.build_successors();
        t.discard_frequencies();
        t.reorder_by_relation();

        // All scores are MAX now, so the order is purely lexical.
        let z = t.get_token_index("z").unwrap();
        let a = t.get_token_index("a").unwrap();
        assert_eq!(t.successors().get(z), Some(a));
    }

    #[test]
    fn test_reorder_small_vocab_is_noop() {
        let mut t = Tokenizer::new();
        t.ingest_text("");
        let before = t.clone();
        t.reorder_by_relation();
        assert_eq!(t, before);

        let mut empty = Tokenizer::new();
        empty.reorder_by_relation();
        assert_eq!(empty.count(), 0);
    }

    #[test]
    fn test_reorder_is_deterministic() {
        let texts = ["one two three", "two three one", "three one two two"];
        let mut a = Tokenizer::new();
        let mut b = Tokenizer::new();
        a.ingest_all(texts);
        b.ingest_all(texts);
        a.reorder_by_relation();
        b.reorder_by_relation();
        assert_eq!(a, b);
    }
}
