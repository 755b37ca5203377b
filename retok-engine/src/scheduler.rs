//! Batch scheduling
//!
//! Flattens the windows of all inputs into one list of entries and cuts it
//! into model batches. Sorting by length keeps padding low inside a batch;
//! results are routed back by `(input_index, window_position)`, so the order
//! chosen here never affects the merged output.

use crate::window::{WindowGeometry, WindowPlan};
use tracing::trace;

/// One window scheduled for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEntry {
    /// Input the window belongs to
    pub input_index: usize,
    /// Position of the window within its input's plan
    pub window_position: usize,
    /// First character sent to the model
    pub context_start: usize,
    /// One past the last character sent to the model
    pub context_end: usize,
}

impl BatchEntry {
    /// Characters sent to the model for this entry
    pub fn len(&self) -> usize {
        self.context_end - self.context_start
    }

    /// True for the window of an empty input
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scheduled work for a set of inputs
#[derive(Debug, Clone)]
pub struct Schedule {
    plans: Vec<WindowPlan>,
    entries: Vec<BatchEntry>,
    batch_size: usize,
}

impl Schedule {
    /// Window plan per input
    pub fn plans(&self) -> &[WindowPlan] {
        &self.plans
    }

    /// Expected number of window results per input
    pub fn window_counts(&self) -> Vec<usize> {
        self.plans.iter().map(WindowPlan::len).collect()
    }

    /// All entries in dispatch order
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Entries cut into batches of at most `batch_size`
    pub fn batches(&self) -> std::slice::Chunks<'_, BatchEntry> {
        self.entries.chunks(self.batch_size)
    }

    /// Number of batches
    pub fn num_batches(&self) -> usize {
        self.entries.len().div_ceil(self.batch_size)
    }

    /// Total characters sent to the model
    pub fn total_chars(&self) -> usize {
        self.entries.iter().map(BatchEntry::len).sum()
    }
}

/// Plans every input and orders the resulting windows into batches
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    geometry: WindowGeometry,
    batch_size: usize,
    sort_by_length: bool,
}

impl BatchScheduler {
    /// Create a scheduler; a batch size of zero is treated as one
    pub fn new(geometry: WindowGeometry, batch_size: usize, sort_by_length: bool) -> Self {
        Self {
            geometry,
            batch_size: batch_size.max(1),
            sort_by_length,
        }
    }

    /// Window geometry used for planning
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    /// Schedule inputs given as cleaned text
    pub fn schedule<S: AsRef<str>>(&self, inputs: &[S]) -> Schedule {
        let mut plans = Vec::with_capacity(inputs.len());
        let mut entries = Vec::with_capacity(inputs.len());

        for (input_index, input) in inputs.iter().enumerate() {
            let plan = self.geometry.plan(input.as_ref().chars().count());
            if !plan.is_single() {
                trace!(
                    input_index,
                    input_length = plan.input_length(),
                    windows = plan.len(),
                    "split input into windows"
                );
            }

            entries.extend(plan.windows().iter().map(|window| BatchEntry {
                input_index,
                window_position: window.index,
                context_start: window.context_start,
                context_end: window.context_end,
            }));
            plans.push(plan);
        }

        if self.sort_by_length {
            // stable: equal lengths keep input order
            entries.sort_by_key(|entry| std::cmp::Reverse(entry.len()));
        }

        Schedule {
            plans,
            entries,
            batch_size: self.batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(sort: bool) -> BatchScheduler {
        BatchScheduler::new(WindowGeometry::new(8, 6).unwrap(), 2, sort)
    }

    #[test]
    fn test_one_entry_per_short_input() {
        let schedule = scheduler(false).schedule(&["abc", "", "abcdefgh"]);

        assert_eq!(schedule.window_counts(), vec![1, 1, 1]);
        assert_eq!(schedule.entries().len(), 3);
        assert_eq!(schedule.total_chars(), 11);
        assert!(schedule.entries()[1].is_empty());
    }

    #[test]
    fn test_long_input_is_split() {
        let schedule = scheduler(false).schedule(&["x".repeat(20)]);

        assert_eq!(schedule.window_counts(), vec![4]);
        let positions: Vec<usize> = schedule
            .entries()
            .iter()
            .map(|e| e.window_position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert_eq!(schedule.entries()[1].context_start, 5);
        assert_eq!(schedule.entries()[1].context_end, 13);
    }

    #[test]
    fn test_sorted_by_length_descending() {
        let schedule = scheduler(true).schedule(&["ab", "abcdef", "abcd", "xy"]);
        let order: Vec<usize> = schedule.entries().iter().map(|e| e.input_index).collect();

        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_batches_respect_batch_size() {
        let schedule = scheduler(false).schedule(&["a", "b", "c", "d", "e"]);
        let sizes: Vec<usize> = schedule.batches().map(<[BatchEntry]>::len).collect();

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(schedule.num_batches(), 3);
    }

    #[test]
    fn test_lengths_are_characters() {
        let schedule = scheduler(false).schedule(&["äöü"]);
        assert_eq!(schedule.total_chars(), 3);
    }
}
