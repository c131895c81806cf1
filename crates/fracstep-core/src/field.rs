//! Multi-component field vectors.
//!
//! A [`FieldVector`] stores several named sub-arrays back to back in one
//! contiguous buffer, so linear algebra sees a single flat vector while
//! assembly and I/O address one component at a time. Velocity fluxes use
//! one component per direction; the pressure/force field uses the pressure
//! followed by one force component per direction in immersed-boundary runs.

use std::ops::Range;

use smallvec::SmallVec;

/// Flat vector partitioned into consecutive components.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldVector {
    values: Vec<f64>,
    offsets: SmallVec<[usize; 5]>,
}

/// Flux unknowns, one component per spatial direction.
pub type VelocityField = FieldVector;

/// Pressure unknowns followed by optional boundary-force components.
pub type PressureForceField = FieldVector;

impl FieldVector {
    /// Zero-filled vector with the given component sizes.
    pub fn zeros(sizes: &[usize]) -> Self {
        let mut offsets = SmallVec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        let mut total = 0;
        for &s in sizes {
            total += s;
            offsets.push(total);
        }
        Self {
            values: vec![0.0; total],
            offsets,
        }
    }

    /// Total number of entries across all components.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of components.
    pub fn num_components(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Index range of component `c` within the flat buffer.
    ///
    /// # Panics
    ///
    /// Panics if `c >= num_components()`.
    pub fn range(&self, c: usize) -> Range<usize> {
        self.offsets[c]..self.offsets[c + 1]
    }

    /// Component sizes in order.
    pub fn sizes(&self) -> SmallVec<[usize; 4]> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Read-only view of component `c`.
    pub fn component(&self, c: usize) -> &[f64] {
        &self.values[self.range(c)]
    }

    /// Mutable view of component `c`.
    pub fn component_mut(&mut self, c: usize) -> &mut [f64] {
        let r = self.range(c);
        &mut self.values[r]
    }

    /// The whole buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// The whole buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Overwrite every entry from a flat slice of equal length.
    ///
    /// # Panics
    ///
    /// Panics on a length mismatch.
    pub fn copy_from_slice(&mut self, src: &[f64]) {
        self.values.copy_from_slice(src);
    }

    /// Set every entry to `value`.
    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn components_are_contiguous() {
        let mut f = FieldVector::zeros(&[3, 2]);
        f.component_mut(1).copy_from_slice(&[7.0, 8.0]);
        assert_eq!(f.as_slice(), &[0.0, 0.0, 0.0, 7.0, 8.0]);
        assert_eq!(f.range(1), 3..5);
        assert_eq!(f.num_components(), 2);
    }

    #[test]
    fn empty_component_allowed() {
        let f = FieldVector::zeros(&[4, 0]);
        assert_eq!(f.component(1).len(), 0);
        assert_eq!(f.len(), 4);
    }

    proptest! {
        #[test]
        fn sizes_sum_to_len(sizes in proptest::collection::vec(0usize..50, 1..5)) {
            let f = FieldVector::zeros(&sizes);
            prop_assert_eq!(f.len(), sizes.iter().sum::<usize>());
            prop_assert_eq!(f.sizes().to_vec(), sizes);
        }
    }
}
