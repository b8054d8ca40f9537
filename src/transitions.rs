/* ------------------------------------------------------------------ */
/* Bigram statistics: transition counts and target labels           */
/* ------------------------------------------------------------------ */
//
// Both maps are BTreeMaps so every walk over them runs in ascending
// index order. That order is what makes successor ties, reordering
// scores and training batches reproducible across runs.

use std::collections::BTreeMap;

/// src → (dst → count) over adjacent token pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionTable {
    rows: BTreeMap<usize, BTreeMap<usize, u64>>,
}

impl TransitionTable {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, src: usize, dst: usize) {
        self.add(src, dst, 1);
    }

    // Used by record, reindexing and checkpoint loading.
    pub(crate) fn add(&mut self, src: usize, dst: usize, count: u64) {
        *self.rows.entry(src).or_default().entry(dst).or_insert(0) += count;
    }

    pub fn row(&self, src: usize) -> Option<&BTreeMap<usize, u64>> {
        self.rows.get(&src)
    }

    pub fn row_total(&self, src: usize) -> u64 {
        self.rows.get(&src).map_or(0, |r| r.values().sum())
    }

    #[cfg(test)]
    pub fn count(&self, src: usize, dst: usize) -> u64 {
        self.rows.get(&src).and_then(|r| r.get(&dst)).copied().unwrap_or(0)
    }

    pub fn rows(&self) -> impl Iterator<Item = (usize, &BTreeMap<usize, u64>)> {
        self.rows.iter().map(|(&src, row)| (src, row))
    }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn n_rows(&self) -> usize { self.rows.len() }

    /// Total number of recorded pair occurrences.
    pub fn total(&self) -> u64 {
        self.rows.values().flat_map(|r| r.values()).sum()
    }

    /// Rebuild under a new index space. `remap[old] = new`.
    pub fn remapped(&self, remap: &[usize]) -> Self {
        let mut out = Self::new();
        for (&src, row) in &self.rows {
            for (&dst, &count) in row {
                out.add(remap[src], remap[dst], count);
            }
        }
        out
    }
}

/// src → most frequent dst: the single training label per source token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuccessorMap {
    labels: BTreeMap<usize, usize>,
}

impl SuccessorMap {
    /// Argmax of every non-empty row. Rows are walked in ascending dst
    /// order and only a strictly higher count replaces the current best,
    /// so ties go to the lowest destination index.
    pub fn build(table: &TransitionTable) -> Self {
        let mut labels = BTreeMap::new();
        for (src, row) in table.rows() {
            let mut best: Option<(usize, u64)> = None;
            for (&dst, &count) in row {
                if count > best.map_or(0, |(_, c)| c) {
                    best = Some((dst, count));
                }
            }
            if let Some((dst, _)) = best {
                labels.insert(src, dst);
            }
        }
        Self { labels }
    }

    pub(crate) fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self { labels: pairs.into_iter().collect() }
    }

    pub fn get(&self, src: usize) -> Option<usize> {
        self.labels.get(&src).copied()
    }

    /// (src, label) pairs in ascending src order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.labels.iter().map(|(&s, &d)| (s, d)).collect()
    }

    pub fn len(&self) -> usize { self.labels.len() }

    pub fn is_empty(&self) -> bool { self.labels.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_row_total() {
        let mut t = TransitionTable::new();
        t.record(0, 1);
        t.record(0, 1);
        t.record(0, 2);
        t.record(3, 0);
        assert_eq!(t.count(0, 1), 2);
        assert_eq!(t.count(0, 2), 1);
        assert_eq!(t.row_total(0), 3);
        assert_eq!(t.row_total(3), 1);
        assert_eq!(t.row_total(7), 0);
        assert_eq!(t.total(), 4);
        assert_eq!(t.n_rows(), 2);
    }

    #[test]
    fn test_build_picks_majority() {
        let mut t = TransitionTable::new();
        for dst in [2, 1, 2, 3] { t.record(0, dst); }
        let m = SuccessorMap::build(&t);
        assert_eq!(m.get(0), Some(2));
    }

    #[test]
    fn test_build_tie_goes_to_lowest_destination() {
        let mut t = TransitionTable::new();
        // Insertion order must not matter.
        t.record(5, 9);
        t.record(5, 4);
        t.record(5, 7);
        let m = SuccessorMap::build(&t);
        assert_eq!(m.get(5), Some(4));
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut t = TransitionTable::new();
        for (s, d) in [(0, 1), (1, 2), (1, 3), (2, 0), (2, 0), (3, 1)] {
            t.record(s, d);
        }
        assert_eq!(SuccessorMap::build(&t), SuccessorMap::build(&t));
    }

    #[test]
    fn test_empty_table_gives_empty_map() {
        let m = SuccessorMap::build(&TransitionTable::new());
        assert!(m.is_empty());
        assert!(m.pairs().is_empty());
    }

    #[test]
    fn test_remapped_preserves_counts() {
        let mut t = TransitionTable::new();
        t.record(0, 1);
        t.record(0, 1);
        t.record(1, 2);
        let remap = [2, 0, 1];
        let r = t.remapped(&remap);
        assert_eq!(r.count(2, 0), 2);
        assert_eq!(r.count(0, 1), 1);
        assert_eq!(r.total(), t.total());
    }
}
