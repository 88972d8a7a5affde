//! Kernel truncation math and named kernels
//!
//! Gaussian kernels are mathematically infinite; the simulator materializes
//! only the samples within a truncation range around the center. The range
//! is computed here once, when the pattern is built against a known field
//! size, and carried on the pattern.

use super::{GaussPattern, SumPattern, WeightPattern};
use crate::error::{DynfieldError, Result};
use serde::{Deserialize, Serialize};

/// Default number of sigmas a kernel extends before truncation.
pub const DEFAULT_CUTOFF_FACTOR: f64 = 4.0;

/// Per-axis sigmas of the excitatory component of the stabilized kernel.
pub const STABILIZED_EXCITATORY_SIGMAS: [f64; 3] = [2.0, 2.0, 0.1];
/// Per-axis sigmas of the inhibitory component of the stabilized kernel.
pub const STABILIZED_INHIBITORY_SIGMAS: [f64; 3] = [4.0, 4.0, 0.1];
pub const STABILIZED_EXCITATORY_HEIGHT: f64 = 1.0;
pub const STABILIZED_INHIBITORY_HEIGHT: f64 = -0.5;

/// Name of the stabilized difference-of-Gaussians kernel.
pub const STABILIZED: &str = "stabilized";

/// Number of samples materialized on each side of the kernel center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelRange {
    pub low: usize,
    pub high: usize,
}

impl KernelRange {
    pub fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    /// Total kernel extent including the center sample.
    pub fn width(&self) -> usize {
        self.low + self.high + 1
    }

    /// Per-side maximum of two ranges.
    pub fn union(self, other: Self) -> Self {
        Self {
            low: self.low.max(other.low),
            high: self.high.max(other.high),
        }
    }
}

/// Field geometry a kernel is truncated against.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    /// Sample count per field axis
    pub field_sizes: Vec<usize>,
    /// Whether the field domain wraps around
    pub circular: bool,
    /// Sigmas before the tail is dropped
    pub cutoff_factor: f64,
}

impl Truncation {
    pub fn for_sizes(field_sizes: &[usize]) -> Self {
        Self {
            field_sizes: field_sizes.to_vec(),
            circular: false,
            cutoff_factor: DEFAULT_CUTOFF_FACTOR,
        }
    }

    pub fn circular(mut self, circular: bool) -> Self {
        self.circular = circular;
        self
    }

    pub fn with_cutoff_factor(mut self, cutoff_factor: f64) -> Self {
        self.cutoff_factor = cutoff_factor;
        self
    }

    /// Ranges for one sigma per axis.
    pub fn ranges_for(&self, sigmas: &[f64]) -> Result<Vec<KernelRange>> {
        if sigmas.len() != self.field_sizes.len() {
            return Err(DynfieldError::DimensionalityMismatch {
                expected: self.field_sizes.len(),
                actual: sigmas.len(),
            });
        }
        Ok(sigmas
            .iter()
            .zip(&self.field_sizes)
            .map(|(&sigma, &size)| compute_kernel_range(sigma, self.cutoff_factor, size, self.circular))
            .collect())
    }
}

/// Symmetric truncation range for a Gaussian of width `sigma`.
///
/// On a bounded axis the kernel never needs to reach further than the
/// field itself. On a circular axis it never needs to reach past the
/// antipode, which for even sizes falls between two samples.
pub fn compute_kernel_range(
    sigma: f64,
    cutoff_factor: f64,
    field_size: usize,
    circular: bool,
) -> KernelRange {
    let r = (sigma * cutoff_factor).ceil().max(0.0) as usize;
    let max_offset = field_size.saturating_sub(1);

    if circular {
        let h = max_offset as f64 / 2.0;
        KernelRange::new(r.min(h.floor() as usize), r.min(h.ceil() as usize))
    } else {
        let r = r.min(max_offset);
        KernelRange::new(r, r)
    }
}

/// Difference-of-Gaussians kernel for three-dimensional fields.
pub fn stabilized_kernel(dimensionality: usize, truncation: Option<&Truncation>) -> Result<WeightPattern> {
    if dimensionality != 3 {
        return Err(DynfieldError::InvalidConfiguration(format!(
            "the stabilized kernel is only defined for 3 dimensions, got {}",
            dimensionality
        )));
    }

    let excitatory = GaussPattern::new(STABILIZED_EXCITATORY_HEIGHT, STABILIZED_EXCITATORY_SIGMAS.to_vec());
    let inhibitory = GaussPattern::new(STABILIZED_INHIBITORY_HEIGHT, STABILIZED_INHIBITORY_SIGMAS.to_vec());
    let mut sum = SumPattern::new(vec![
        WeightPattern::Gauss(excitatory),
        WeightPattern::Gauss(inhibitory),
    ])?;
    if let Some(truncation) = truncation {
        sum = sum.truncated(truncation)?;
    }
    Ok(WeightPattern::Sum(sum))
}

/// Resolve a kernel by name.
pub fn named_kernel(name: &str, dimensionality: usize, truncation: Option<&Truncation>) -> Result<WeightPattern> {
    match name.to_lowercase().as_str() {
        STABILIZED => stabilized_kernel(dimensionality, truncation),
        _ => Err(DynfieldError::InvalidConfiguration(format!(
            "unknown kernel name: {}",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_circular_range() {
        assert_eq!(compute_kernel_range(2.0, 4.0, 25, false), KernelRange::new(8, 8));
        // Capped at field_size - 1
        assert_eq!(compute_kernel_range(10.0, 4.0, 25, false), KernelRange::new(24, 24));
        // ceil of fractional reach
        assert_eq!(compute_kernel_range(1.1, 3.0, 51, false), KernelRange::new(4, 4));
    }

    #[test]
    fn test_circular_range() {
        assert_eq!(compute_kernel_range(10.0, 4.0, 25, true), KernelRange::new(12, 12));
        // Even size: antipode lies between samples
        assert_eq!(compute_kernel_range(10.0, 4.0, 24, true), KernelRange::new(11, 12));
        // Small sigma is not capped
        assert_eq!(compute_kernel_range(1.0, 4.0, 25, true), KernelRange::new(4, 4));
    }

    #[test]
    fn test_stabilized_kernel_requires_three_dims() {
        let err = stabilized_kernel(2, None).unwrap_err();
        assert!(matches!(err, DynfieldError::InvalidConfiguration(_)));

        let kernel = stabilized_kernel(3, None).unwrap();
        let sum = match kernel {
            WeightPattern::Sum(sum) => sum,
            other => panic!("expected sum, got {:?}", other),
        };
        assert_eq!(sum.patterns().len(), 2);

        let sigmas: Vec<&[f64]> = sum
            .patterns()
            .iter()
            .map(|p| match p {
                WeightPattern::Gauss(g) => g.sigmas(),
                other => panic!("expected gauss, got {:?}", other),
            })
            .collect();
        assert_eq!(sigmas[0], &STABILIZED_EXCITATORY_SIGMAS);
        assert_eq!(sigmas[1], &STABILIZED_INHIBITORY_SIGMAS);
    }

    #[test]
    fn test_stabilized_kernel_with_truncation() {
        let truncation = Truncation::for_sizes(&[51, 51, 11]);
        let kernel = stabilized_kernel(3, Some(&truncation)).unwrap();
        let WeightPattern::Sum(sum) = kernel else {
            panic!("expected sum");
        };
        // Inhibitory sigma dominates on the first two axes
        let range = sum.range().unwrap();
        assert_eq!(range[0], KernelRange::new(16, 16));
        assert_eq!(range[1], KernelRange::new(16, 16));
        assert_eq!(range[2], KernelRange::new(1, 1));
    }

    #[test]
    fn test_unknown_named_kernel() {
        assert!(named_kernel("mexican_hat", 3, None).is_err());
        assert!(named_kernel("Stabilized", 3, None).is_ok());
    }
}
