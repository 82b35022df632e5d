//! Aggregation translator: the trained group-sum + softmax head becomes a
//! popcount-and-compare network.
//!
//! Class `c` owns the contiguous vote block `[c * G, (c + 1) * G)`. The
//! comparator scans classes in ascending order and only replaces the
//! running best on a strictly larger count, so an exact tie resolves to
//! the lowest class index.

use crate::model::AggregationLayer;
use crate::walk::ModelParams;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgmaxSpec {
    pub num_classes: usize,
    /// Votes per class.
    pub group_size: usize,
    /// Bits needed to hold a count in `0..=group_size`.
    pub count_width: usize,
}

impl ArgmaxSpec {
    pub fn new(num_classes: usize, group_size: usize) -> Self {
        let count_width = (usize::BITS - group_size.leading_zeros()).max(1) as usize;
        Self {
            num_classes,
            group_size,
            count_width,
        }
    }

    /// Translate the trained aggregation layer. `tau` only scales the
    /// training-time softmax and has no effect on the argmax.
    pub fn translate(layer: &AggregationLayer, params: &ModelParams) -> Self {
        tracing::debug!(
            num_classes = layer.num_classes,
            tau = layer.tau,
            "aggregation lowered to argmax comparator"
        );
        Self::new(layer.num_classes, params.group_size())
    }

    pub fn input_width(&self) -> usize {
        self.num_classes * self.group_size
    }

    /// Per-class popcount of the vote bus.
    pub fn votes(&self, bus: &[bool]) -> Vec<usize> {
        bus.chunks(self.group_size.max(1))
            .take(self.num_classes)
            .map(|group| group.iter().filter(|b| **b).count())
            .collect()
    }

    /// Index of the largest vote; lowest index on a tie.
    pub fn select(&self, votes: &[usize]) -> usize {
        let mut best = 0;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }
        best
    }

    /// One-hot output of width `num_classes`.
    pub fn evaluate(&self, bus: &[bool]) -> Vec<bool> {
        let winner = self.select(&self.votes(bus));
        (0..self.num_classes).map(|c| c == winner).collect()
    }
}
