use rand::Rng;

use crate::error::{Result, SplitError};

/// Strictly increasing record indices chosen from `[0, universe)`.
///
/// A selection is built once per run and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    indices: Vec<usize>,
    universe: usize,
}

impl SelectionSet {
    /// Draw `amount` distinct indices uniformly from `[0, universe)` and sort
    /// them back into stream order.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, universe: usize, amount: usize) -> Result<Self> {
        if amount > universe {
            return Err(SplitError::InvalidSampleSize {
                requested: amount,
                available: universe,
            });
        }
        let mut indices = rand::seq::index::sample(rng, universe, amount).into_vec();
        indices.sort_unstable();
        Ok(Self { indices, universe })
    }

    /// Use a caller-chosen selection. Indices must be strictly increasing
    /// and below `universe`.
    pub fn from_indices(universe: usize, indices: Vec<usize>) -> Result<Self> {
        if let Some(window) = indices.windows(2).find(|w| w[0] >= w[1]) {
            return Err(SplitError::InvalidSelection(format!(
                "indices must be strictly increasing, found {} before {}",
                window[0], window[1]
            )));
        }
        if let Some(&last) = indices.last() {
            if last >= universe {
                return Err(SplitError::InvalidSelection(format!(
                    "index {} is outside [0, {})",
                    last, universe
                )));
            }
        }
        Ok(Self { indices, universe })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Size of the index space the selection was drawn from (the declared N).
    pub fn universe(&self) -> usize {
        self.universe
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Walk the selection alongside a forward-only stream.
    pub fn cursor(&self) -> SelectionCursor<'_> {
        SelectionCursor {
            indices: &self.indices,
            matched: 0,
        }
    }
}

/// Tracks the next pending selected index while records stream past.
///
/// `advance` must be called with every stream index in increasing order.
#[derive(Debug)]
pub struct SelectionCursor<'a> {
    indices: &'a [usize],
    matched: usize,
}

impl SelectionCursor<'_> {
    /// Returns true if `index` is selected, consuming it.
    pub fn advance(&mut self, index: usize) -> bool {
        match self.indices.get(self.matched) {
            Some(&next) if next == index => {
                self.matched += 1;
                true
            }
            _ => false,
        }
    }

    /// Number of selected indices seen so far.
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// True once every selected index has been seen.
    pub fn is_exhausted(&self) -> bool {
        self.matched == self.indices.len()
    }
}
