//! Weight patterns
//!
//! Declarative descriptions of synaptic weight kernels. Patterns are plain
//! values: the simulator samples them into tensors, this crate only checks
//! that composites are dimensionally consistent.
//!
//! ```text
//! Custom(tensor)              rank = tensor rank
//! Gauss(height, sigmas, mean) rank = len(sigmas)
//! Sum([p, q, ...])            rank = rank(p), all children equal
//! Repeat(p, n)                rank = rank(p) + 1
//! RepeatedValue(v, shape)     rank = len(shape)
//! ```

mod kernel;

pub use kernel::{
    compute_kernel_range, named_kernel, stabilized_kernel, KernelRange, Truncation,
    DEFAULT_CUTOFF_FACTOR, STABILIZED, STABILIZED_EXCITATORY_HEIGHT,
    STABILIZED_EXCITATORY_SIGMAS, STABILIZED_INHIBITORY_HEIGHT, STABILIZED_INHIBITORY_SIGMAS,
};

use crate::error::{DynfieldError, Result};
use crate::tensor::Tensor;
use serde::Serialize;
use std::fmt;

/// Synaptic weight pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WeightPattern {
    /// Explicit numeric array
    Custom(Tensor),
    /// Gaussian bump
    Gauss(GaussPattern),
    /// Elementwise sum of patterns of equal dimensionality
    Sum(SumPattern),
    /// Inner pattern broadcast along one new axis
    Repeat(RepeatPattern),
    /// Constant value over a shape
    RepeatedValue { value: f64, shape: Vec<usize> },
}

impl WeightPattern {
    pub fn custom(tensor: impl Into<Tensor>) -> Self {
        Self::Custom(tensor.into())
    }

    pub fn gauss(height: f64, sigmas: Vec<f64>) -> Self {
        Self::Gauss(GaussPattern::new(height, sigmas))
    }

    pub fn sum(patterns: Vec<WeightPattern>) -> Result<Self> {
        SumPattern::new(patterns).map(Self::Sum)
    }

    pub fn repeat(pattern: WeightPattern, num_repeats: usize) -> Self {
        Self::Repeat(RepeatPattern::new(pattern, num_repeats))
    }

    pub fn repeated_value(value: f64, shape: Vec<usize>) -> Self {
        Self::RepeatedValue { value, shape }
    }

    pub fn dimensionality(&self) -> usize {
        match self {
            Self::Custom(tensor) => tensor.rank(),
            Self::Gauss(gauss) => gauss.dimensionality(),
            Self::Sum(sum) => sum.dimensionality(),
            Self::Repeat(repeat) => repeat.dimensionality(),
            Self::RepeatedValue { shape, .. } => shape.len(),
        }
    }

    /// Precomputed truncation range, if the pattern was built against a field size.
    pub fn range(&self) -> Option<&[KernelRange]> {
        match self {
            Self::Gauss(gauss) => gauss.range(),
            Self::Sum(sum) => sum.range(),
            _ => None,
        }
    }
}

/// Gaussian weight pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaussPattern {
    height: f64,
    mean: Vec<f64>,
    sigmas: Vec<f64>,
    range: Option<Vec<KernelRange>>,
}

impl GaussPattern {
    /// Gaussian centered at the origin.
    pub fn new(height: f64, sigmas: Vec<f64>) -> Self {
        Self {
            height,
            mean: vec![0.0; sigmas.len()],
            sigmas,
            range: None,
        }
    }

    pub fn with_mean(mut self, mean: Vec<f64>) -> Result<Self> {
        if mean.len() != self.sigmas.len() {
            return Err(DynfieldError::InvalidConfiguration(format!(
                "gauss mean has {} entries but there are {} sigmas",
                mean.len(),
                self.sigmas.len()
            )));
        }
        self.mean = mean;
        Ok(self)
    }

    /// Attach a truncation range computed against a field geometry.
    pub fn truncated(mut self, truncation: &Truncation) -> Result<Self> {
        self.range = Some(truncation.ranges_for(&self.sigmas)?);
        Ok(self)
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn sigmas(&self) -> &[f64] {
        &self.sigmas
    }

    pub fn range(&self) -> Option<&[KernelRange]> {
        self.range.as_deref()
    }

    pub fn dimensionality(&self) -> usize {
        self.sigmas.len()
    }
}

/// Sum of patterns sharing one dimensionality
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumPattern {
    patterns: Vec<WeightPattern>,
    range: Option<Vec<KernelRange>>,
}

impl SumPattern {
    pub fn new(patterns: Vec<WeightPattern>) -> Result<Self> {
        let first = patterns.first().ok_or_else(|| {
            DynfieldError::InvalidConfiguration("sum pattern needs at least one component".to_string())
        })?;
        let ndim = first.dimensionality();
        if let Some(bad) = patterns.iter().find(|p| p.dimensionality() != ndim) {
            return Err(DynfieldError::InvalidConfiguration(format!(
                "cannot sum patterns of dimensionality {} and {}",
                ndim,
                bad.dimensionality()
            )));
        }
        Ok(Self {
            patterns,
            range: None,
        })
    }

    /// Attach a truncation range.
    ///
    /// Only the difference-of-Gaussians case (exactly two Gauss components)
    /// gets a range; it covers both components. Other sums are returned
    /// unchanged.
    pub fn truncated(mut self, truncation: &Truncation) -> Result<Self> {
        match self.patterns.as_slice() {
            [WeightPattern::Gauss(a), WeightPattern::Gauss(b)] => {
                let ra = truncation.ranges_for(a.sigmas())?;
                let rb = truncation.ranges_for(b.sigmas())?;
                self.range = Some(ra.into_iter().zip(rb).map(|(x, y)| x.union(y)).collect());
            }
            _ => {
                log::debug!(
                    "Not truncating sum of {} components (only two-Gaussian sums are truncated)",
                    self.patterns.len()
                );
            }
        }
        Ok(self)
    }

    pub fn patterns(&self) -> &[WeightPattern] {
        &self.patterns
    }

    pub fn range(&self) -> Option<&[KernelRange]> {
        self.range.as_deref()
    }

    pub fn dimensionality(&self) -> usize {
        self.patterns[0].dimensionality()
    }
}

/// Pattern repeated along a new axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatPattern {
    pattern: Box<WeightPattern>,
    num_repeats: usize,
}

impl RepeatPattern {
    pub fn new(pattern: WeightPattern, num_repeats: usize) -> Self {
        Self {
            pattern: Box::new(pattern),
            num_repeats,
        }
    }

    pub fn pattern(&self) -> &WeightPattern {
        &self.pattern
    }

    pub fn num_repeats(&self) -> usize {
        self.num_repeats
    }

    pub fn dimensionality(&self) -> usize {
        self.pattern.dimensionality() + 1
    }
}

/// Synaptic weights: either a full pattern or a single scalar gain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Weights {
    Pattern(WeightPattern),
    Scalar(f64),
}

impl From<WeightPattern> for Weights {
    fn from(pattern: WeightPattern) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<f64> for Weights {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<i32> for Weights {
    fn from(value: i32) -> Self {
        Self::Scalar(value as f64)
    }
}

/// Array literals become custom patterns.
impl From<Vec<f64>> for Weights {
    fn from(values: Vec<f64>) -> Self {
        Self::Pattern(WeightPattern::Custom(Tensor::from_vec(values)))
    }
}

impl From<Tensor> for Weights {
    fn from(tensor: Tensor) -> Self {
        Self::Pattern(WeightPattern::Custom(tensor))
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[f64]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, "]")
}

fn write_tensor(f: &mut fmt::Formatter<'_>, shape: &[usize], data: &[f64]) -> fmt::Result {
    match shape {
        [] => write!(f, "{}", data.first().copied().unwrap_or(0.0)),
        [_] => write_list(f, data),
        [n, rest @ ..] => {
            let stride: usize = rest.iter().product();
            write!(f, "[")?;
            for i in 0..*n {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_tensor(f, rest, &data[i * stride..(i + 1) * stride])?;
            }
            write!(f, "]")
        }
    }
}

/// Same syntax the architecture parser accepts.
impl fmt::Display for WeightPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(tensor) => {
                write!(f, "custom(")?;
                write_tensor(f, &tensor.shape, &tensor.data)?;
                write!(f, ")")
            }
            Self::Gauss(g) => {
                write!(f, "gauss({}, ", g.height)?;
                write_list(f, &g.sigmas)?;
                if g.mean.iter().any(|&m| m != 0.0) {
                    write!(f, ", ")?;
                    write_list(f, &g.mean)?;
                }
                write!(f, ")")
            }
            Self::Sum(sum) => {
                write!(f, "sum(")?;
                for (i, p) in sum.patterns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Self::Repeat(r) => write!(f, "repeat({}, {})", r.pattern, r.num_repeats),
            Self::RepeatedValue { value, shape } => {
                write!(f, "repeated({}, [", value)?;
                for (i, s) in shape.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", s)?;
                }
                write!(f, "])")
            }
        }
    }
}

impl fmt::Display for Weights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(p) => write!(f, "{}", p),
            Self::Scalar(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensionality_of_leaves() {
        assert_eq!(WeightPattern::custom(vec![1.0, 2.0, 3.0]).dimensionality(), 1);
        assert_eq!(WeightPattern::gauss(1.0, vec![2.0, 2.0]).dimensionality(), 2);
        assert_eq!(WeightPattern::repeated_value(0.5, vec![3, 3, 3]).dimensionality(), 3);
    }

    #[test]
    fn test_composites_derive_dimensionality() {
        let sum = WeightPattern::sum(vec![
            WeightPattern::gauss(1.0, vec![2.0, 2.0]),
            WeightPattern::gauss(-0.5, vec![4.0, 4.0]),
        ])
        .unwrap();
        assert_eq!(sum.dimensionality(), 2);

        let repeat = WeightPattern::repeat(sum, 10);
        assert_eq!(repeat.dimensionality(), 3);
    }

    #[test]
    fn test_sum_rejects_mixed_dimensionality() {
        let err = WeightPattern::sum(vec![
            WeightPattern::gauss(1.0, vec![2.0, 2.0]),
            WeightPattern::gauss(1.0, vec![2.0, 2.0, 2.0]),
        ])
        .unwrap_err();
        match err {
            DynfieldError::InvalidConfiguration(message) => {
                assert!(message.contains("dimensionality 2 and 3"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(WeightPattern::sum(vec![]).is_err());
    }

    #[test]
    fn test_gauss_mean_length_checked() {
        let err = GaussPattern::new(1.0, vec![2.0, 2.0]).with_mean(vec![1.0]).unwrap_err();
        assert!(matches!(err, DynfieldError::InvalidConfiguration(_)));
        let g = GaussPattern::new(1.0, vec![2.0, 2.0]).with_mean(vec![1.0, 3.0]).unwrap();
        assert_eq!(g.mean(), &[1.0, 3.0]);
    }

    #[test]
    fn test_gauss_truncation() {
        let g = GaussPattern::new(1.0, vec![2.0])
            .truncated(&Truncation::for_sizes(&[25]))
            .unwrap();
        assert_eq!(g.range(), Some(&[KernelRange::new(8, 8)][..]));

        // Axis count must match the field
        assert!(GaussPattern::new(1.0, vec![2.0])
            .truncated(&Truncation::for_sizes(&[25, 25]))
            .is_err());
    }

    #[test]
    fn test_only_two_gaussian_sums_are_truncated() {
        let truncation = Truncation::for_sizes(&[25]);
        let dog = SumPattern::new(vec![
            WeightPattern::gauss(1.0, vec![1.0]),
            WeightPattern::gauss(-0.5, vec![3.0]),
        ])
        .unwrap()
        .truncated(&truncation)
        .unwrap();
        assert_eq!(dog.range(), Some(&[KernelRange::new(12, 12)][..]));

        let three = SumPattern::new(vec![
            WeightPattern::gauss(1.0, vec![1.0]),
            WeightPattern::gauss(-0.5, vec![3.0]),
            WeightPattern::gauss(0.1, vec![5.0]),
        ])
        .unwrap()
        .truncated(&truncation)
        .unwrap();
        assert!(three.range().is_none());
    }

    #[test]
    fn test_vec_weights_become_custom_pattern() {
        let w: Weights = vec![1.0, 2.0, 3.0].into();
        assert_eq!(
            w,
            Weights::Pattern(WeightPattern::Custom(Tensor::from_vec(vec![1.0, 2.0, 3.0])))
        );
        let s: Weights = 2.into();
        assert_eq!(s, Weights::Scalar(2.0));
    }

    #[test]
    fn test_display() {
        let p = WeightPattern::sum(vec![
            WeightPattern::gauss(1.0, vec![2.0]),
            WeightPattern::repeated_value(0.5, vec![3]),
        ])
        .unwrap();
        assert_eq!(p.to_string(), "sum(gauss(1, [2]), repeated(0.5, [3]))");

        let c = WeightPattern::Custom(Tensor::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap());
        assert_eq!(c.to_string(), "custom([[1, 2], [3, 4]])");
    }
}
