use crate::search::MATE_SCORE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Fail-low: the true score is at most the stored one
    Upper,
    /// Fail-high: the true score is at least the stored one
    Lower,
}

#[derive(Clone, Copy, Debug)]
struct TTEntry {
    hash: u64,
    depth: i32,
    score: i32,
    bound: Bound,
}

/// Direct-mapped, always-replace transposition table keyed by position fingerprint.
pub struct TranspositionTable {
    table: Vec<Option<TTEntry>>,
    used: usize,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        Self::with_entries(Self::entries_for(size_mb))
    }

    pub fn with_entries(entries: usize) -> Self {
        TranspositionTable {
            table: vec![None; entries.max(1)],
            used: 0,
        }
    }

    fn entries_for(size_mb: usize) -> usize {
        (size_mb * 1024 * 1024) / std::mem::size_of::<Option<TTEntry>>()
    }

    pub fn resize(&mut self, size_mb: usize) {
        *self = Self::new(size_mb);
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(|slot| *slot = None);
        self.used = 0;
    }

    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Occupancy in permille, as reported by `info hashfull`.
    pub fn hashfull(&self) -> usize {
        self.used * 1000 / self.capacity()
    }

    #[inline(always)]
    fn index(&self, hash: u64) -> usize {
        (hash % self.table.len() as u64) as usize
    }

    /// Returns a usable score when the entry for `hash` was searched at
    /// least `depth` deep and its bound settles the `(alpha, beta)` window.
    pub fn probe(&self, hash: u64, alpha: i32, beta: i32, depth: i32, ply: usize) -> Option<i32> {
        let entry = self.table[self.index(hash)]?;
        if entry.hash != hash || entry.depth < depth {
            return None;
        }

        // Mate scores are stored relative to the node, read back relative to the root.
        let mut score = entry.score;
        if score < -MATE_SCORE {
            score += ply as i32;
        }
        if score > MATE_SCORE {
            score -= ply as i32;
        }

        match entry.bound {
            Bound::Exact => Some(score),
            Bound::Upper if score <= alpha => Some(alpha),
            Bound::Lower if score >= beta => Some(beta),
            _ => None,
        }
    }

    pub fn store(&mut self, hash: u64, score: i32, depth: i32, bound: Bound, ply: usize) {
        let mut score = score;
        if score < -MATE_SCORE {
            score -= ply as i32;
        }
        if score > MATE_SCORE {
            score += ply as i32;
        }

        let index = self.index(hash);
        if self.table[index].is_none() {
            self.used += 1;
        }
        self.table[index] = Some(TTEntry {
            hash,
            depth,
            score,
            bound,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{INFINITY, MATE_VALUE};

    #[test]
    fn test_exact_entry_ignores_window() {
        let mut tt = TranspositionTable::with_entries(1024);
        tt.store(12345, 37, 4, Bound::Exact, 2);

        assert_eq!(tt.probe(12345, -INFINITY, INFINITY, 4, 2), Some(37));
        assert_eq!(tt.probe(12345, 100, 101, 3, 2), Some(37));
        assert_eq!(tt.probe(12345, -500, -499, 1, 7), Some(37));
    }

    #[test]
    fn test_shallower_entry_is_ignored() {
        let mut tt = TranspositionTable::with_entries(1024);
        tt.store(99, 10, 2, Bound::Exact, 0);
        assert_eq!(tt.probe(99, -50, 50, 3, 0), None);
        assert_eq!(tt.probe(100, -50, 50, 1, 0), None);
    }

    #[test]
    fn test_bounds_fail_hard() {
        let mut tt = TranspositionTable::with_entries(1024);

        tt.store(1, -20, 5, Bound::Upper, 0);
        assert_eq!(tt.probe(1, 0, 10, 5, 0), Some(0));
        assert_eq!(tt.probe(1, -30, -10, 5, 0), None);

        tt.store(2, 80, 5, Bound::Lower, 0);
        assert_eq!(tt.probe(2, 0, 50, 5, 0), Some(50));
        assert_eq!(tt.probe(2, 0, 100, 5, 0), None);
    }

    #[test]
    fn test_mate_scores_shift_with_ply() {
        let mut tt = TranspositionTable::with_entries(1024);

        // Mate found 5 plies from the root, stored at ply 3.
        tt.store(7, MATE_VALUE - 5, 2, Bound::Exact, 3);
        assert_eq!(tt.probe(7, -INFINITY, INFINITY, 2, 3), Some(MATE_VALUE - 5));
        // Reached again at ply 1 the mate is two plies closer.
        assert_eq!(tt.probe(7, -INFINITY, INFINITY, 2, 1), Some(MATE_VALUE - 3));

        tt.store(8, -MATE_VALUE + 6, 2, Bound::Exact, 4);
        assert_eq!(tt.probe(8, -INFINITY, INFINITY, 2, 2), Some(-MATE_VALUE + 4));
    }

    #[test]
    fn test_always_replace() {
        let mut tt = TranspositionTable::with_entries(16);
        tt.store(3, 10, 8, Bound::Exact, 0);
        // Same slot, different key, shallower depth still evicts.
        tt.store(3 + 16, 20, 1, Bound::Exact, 0);
        assert_eq!(tt.probe(3, -100, 100, 0, 0), None);
        assert_eq!(tt.probe(19, -100, 100, 0, 0), Some(20));
        assert_eq!(tt.len(), 1);
    }

    #[test]
    fn test_clear_resize_and_hashfull() {
        let mut tt = TranspositionTable::with_entries(10);
        for key in 0..5 {
            tt.store(key, 0, 1, Bound::Exact, 0);
        }
        assert_eq!(tt.hashfull(), 500);

        tt.clear();
        assert!(tt.is_empty());
        assert_eq!(tt.capacity(), 10);

        tt.resize(1);
        assert!(tt.capacity() > 10);
        assert_eq!(tt.hashfull(), 0);
    }
}
