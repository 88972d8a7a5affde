//! Field dimensions
//!
//! A [`Dimension`] describes one axis of a field's domain: the metric bounds,
//! the number of samples the simulator allocates for it, and optional tick
//! labels for plotting front-ends.

use crate::error::{DynfieldError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One axis of a field domain. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    lower: f64,
    upper: f64,
    size: usize,
    name: String,
    ticklabels: BTreeMap<i64, String>,
}

impl Dimension {
    /// Create a dimension spanning `[lower, upper]` sampled at `size` points.
    ///
    /// Even sizes are accepted but logged, since some simulators center
    /// kernels on a middle sample that only exists for odd sizes.
    pub fn new(lower: f64, upper: f64, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(DynfieldError::InvalidArgument(
                "dimension size must be positive".to_string(),
            ));
        }
        if !(lower < upper) {
            return Err(DynfieldError::InvalidConfiguration(format!(
                "dimension lower bound {} must be below upper bound {}",
                lower, upper
            )));
        }

        let dim = Self {
            lower,
            upper,
            size,
            name: "dim".to_string(),
            ticklabels: BTreeMap::new(),
        };
        if let Some(warning) = dim.compatibility_warning() {
            log::warn!("{}", warning);
        }
        Ok(dim)
    }

    /// Dimension with bounds `[0, size - 1]`.
    ///
    /// A size of one has no extent, so its upper bound is padded to 1.0.
    pub fn from_size(size: usize) -> Result<Self> {
        let upper = if size > 1 { (size - 1) as f64 } else { 1.0 };
        Self::new(0.0, upper, size)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_ticklabels(mut self, ticklabels: BTreeMap<i64, String>) -> Self {
        self.ticklabels = ticklabels;
        self
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ticklabels(&self) -> &BTreeMap<i64, String> {
        &self.ticklabels
    }

    /// Warning text for sizes that may be incompatible across simulators.
    pub fn compatibility_warning(&self) -> Option<String> {
        if self.size % 2 == 0 {
            Some(format!(
                "Dimension '{}' has even size {}. An odd size is recommended to avoid \
                 incompatibilities between different simulation frameworks",
                self.name, self.size
            ))
        } else {
            None
        }
    }
}

/// One [`Dimension::from_size`] per entry.
pub fn dimensions_from_sizes(sizes: &[usize]) -> Result<Vec<Dimension>> {
    sizes.iter().map(|&size| Dimension::from_size(size)).collect()
}

/// Project a list of dimensions to their sample counts.
pub fn shape_from_list_of_dimensions(dimensions: &[Dimension]) -> Vec<usize> {
    dimensions.iter().map(Dimension::size).collect()
}

/// `[lower, upper]` per axis.
pub fn domain_from_list_of_dimensions(dimensions: &[Dimension]) -> Vec<[f64; 2]> {
    dimensions.iter().map(|d| [d.lower, d.upper]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_sizes_have_no_warning() {
        for size in [1, 3, 25, 51, 101] {
            let dim = Dimension::from_size(size).unwrap();
            assert!(dim.compatibility_warning().is_none());
        }
    }

    #[test]
    fn test_even_sizes_warn_but_succeed() {
        for size in [2, 4, 50, 100] {
            let dim = Dimension::from_size(size).unwrap();
            assert_eq!(dim.size(), size);
            assert!(dim.compatibility_warning().is_some());
        }
    }

    #[test]
    fn test_from_size_bounds() {
        let dim = Dimension::from_size(51).unwrap();
        assert_eq!(dim.lower(), 0.0);
        assert_eq!(dim.upper(), 50.0);
        assert_eq!(dim.name(), "dim");
    }

    #[test]
    fn test_from_size_one_pads_upper_bound() {
        let dim = Dimension::from_size(1).unwrap();
        assert_eq!(dim.lower(), 0.0);
        assert_eq!(dim.upper(), 1.0);
        assert_eq!(dim.size(), 1);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Dimension::from_size(0).is_err());
        assert!(Dimension::new(5.0, 5.0, 11).is_err());
        assert!(Dimension::new(6.0, 5.0, 11).is_err());
        assert!(dimensions_from_sizes(&[11, 0]).is_err());
    }

    #[test]
    fn test_shape_and_domain() {
        let dims = dimensions_from_sizes(&[11, 21, 5]).unwrap();
        assert_eq!(shape_from_list_of_dimensions(&dims), vec![11, 21, 5]);

        let hue = Dimension::new(0.0, 360.0, 37).unwrap().with_name("hue");
        assert_eq!(domain_from_list_of_dimensions(&[hue]), vec![[0.0, 360.0]]);
    }
}
