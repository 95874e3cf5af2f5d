//! Ordered, owning collection of partials.

use serde::{Deserialize, Serialize};

use crate::partial::{Partial, UNLABELED};

/// Ordered collection of partials with stable iteration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialList {
    partials: Vec<Partial>,
}

impl PartialList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            partials: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, partial: Partial) {
        self.partials.push(partial);
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Partial> {
        self.partials.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Partial> {
        self.partials.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Partial> {
        self.partials.iter_mut()
    }

    pub fn as_slice(&self) -> &[Partial] {
        &self.partials
    }

    /// Keeps only the partials for which `keep` returns true, preserving order.
    pub fn retain(&mut self, keep: impl FnMut(&Partial) -> bool) {
        self.partials.retain(keep);
    }

    /// Sorts partials by label with a stable sort.
    ///
    /// Unlabeled partials are placed after every labeled one.
    pub fn sort_by_label(&mut self) {
        self.partials
            .sort_by_key(|p| (p.label() == UNLABELED, p.label()));
    }

    /// Distinct positive labels in ascending order.
    pub fn labels(&self) -> Vec<u32> {
        let mut labels: Vec<u32> = self
            .partials
            .iter()
            .map(Partial::label)
            .filter(|&l| l != UNLABELED)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Latest end time over non-empty partials, 0 if there are none.
    pub fn max_end_time(&self) -> f64 {
        self.partials
            .iter()
            .filter(|p| !p.is_empty())
            .map(Partial::end_time)
            .fold(0.0, f64::max)
    }

    /// Earliest start time over non-empty partials, 0 if there are none.
    pub fn min_start_time(&self) -> f64 {
        self.partials
            .iter()
            .filter(|p| !p.is_empty())
            .map(Partial::start_time)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Total number of breakpoints across all partials.
    pub fn breakpoint_count(&self) -> usize {
        self.partials.iter().map(Partial::len).sum()
    }
}

impl FromIterator<Partial> for PartialList {
    fn from_iter<I: IntoIterator<Item = Partial>>(iter: I) -> Self {
        Self {
            partials: iter.into_iter().collect(),
        }
    }
}

impl Extend<Partial> for PartialList {
    fn extend<I: IntoIterator<Item = Partial>>(&mut self, iter: I) {
        self.partials.extend(iter);
    }
}

impl IntoIterator for PartialList {
    type Item = Partial;
    type IntoIter = std::vec::IntoIter<Partial>;

    fn into_iter(self) -> Self::IntoIter {
        self.partials.into_iter()
    }
}

impl<'a> IntoIterator for &'a PartialList {
    type Item = &'a Partial;
    type IntoIter = std::slice::Iter<'a, Partial>;

    fn into_iter(self) -> Self::IntoIter {
        self.partials.iter()
    }
}

impl<'a> IntoIterator for &'a mut PartialList {
    type Item = &'a mut Partial;
    type IntoIter = std::slice::IterMut<'a, Partial>;

    fn into_iter(self) -> Self::IntoIter {
        self.partials.iter_mut()
    }
}

impl From<Vec<Partial>> for PartialList {
    fn from(partials: Vec<Partial>) -> Self {
        Self { partials }
    }
}
