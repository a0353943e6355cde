use std::collections::VecDeque;

use crate::step::GenerationStats;

pub const DEFAULT_HISTORY_LIMIT: usize = 5000;

/// Bounded FIFO of per-generation statistics.
#[derive(Debug, Clone)]
pub struct HistoryTracker {
    limit: usize,
    save_board: bool,
    entries: VecDeque<GenerationStats>,
}

impl Default for HistoryTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, false)
    }
}

impl HistoryTracker {
    pub fn new(limit: usize, save_board: bool) -> Self {
        Self {
            limit,
            save_board,
            entries: VecDeque::with_capacity(limit.min(1024)),
        }
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether recorded entries keep their board snapshot.
    #[inline]
    pub fn saves_boards(&self) -> bool {
        self.save_board
    }

    /// Appends `stats`, then drops the oldest entries while over the limit.
    pub fn record(&mut self, mut stats: GenerationStats) {
        if !self.save_board {
            stats.board = None;
        }
        self.entries.push_back(stats);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &GenerationStats> + '_ {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn latest(&self) -> Option<&GenerationStats> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &GenerationStats> + '_ {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
