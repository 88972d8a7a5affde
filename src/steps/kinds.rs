//! Step variants
//!
//! Each variant is a plain parameter struct with builder-style setters for
//! use before registration. Once a step is registered its parameters are only
//! mutable through [`StepParameters::set_param`], which the owning [`Step`]
//! wraps with change notification.
//!
//! [`Step`]: super::Step

use super::params::{unknown_param, ColorSpace, ParamValue, StepParameters};
use crate::activation::ActivationFunction;
use crate::config::ArchConfig;
use crate::dimension::{
    dimensions_from_sizes, domain_from_list_of_dimensions, shape_from_list_of_dimensions, Dimension,
};
use crate::error::{DynfieldError, Result};
use crate::tensor::Tensor;
use crate::weights::{named_kernel, WeightPattern};
use serde::Serialize;

// =============================================================================
// Dynamic steps
// =============================================================================

/// Neural field: activation over a multi-dimensional domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub dimensions: Vec<Dimension>,
    pub resting_level: f64,
    pub activation_function: ActivationFunction,
    pub time_scale: f64,
    pub interaction_kernel: Option<WeightPattern>,
    pub global_inhibition: f64,
    pub noise_strength: f64,
}

impl Field {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            resting_level: -5.0,
            activation_function: ActivationFunction::sigmoid(100.0),
            time_scale: 100.0,
            interaction_kernel: None,
            global_inhibition: 0.0,
            noise_strength: 0.1,
        }
    }

    pub fn from_sizes(sizes: &[usize]) -> Result<Self> {
        Ok(Self::new(dimensions_from_sizes(sizes)?))
    }

    pub fn with_resting_level(mut self, resting_level: f64) -> Self {
        self.resting_level = resting_level;
        self
    }

    pub fn with_activation_function(mut self, activation_function: ActivationFunction) -> Self {
        self.activation_function = activation_function;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    pub fn with_interaction_kernel(mut self, kernel: WeightPattern) -> Self {
        self.interaction_kernel = Some(kernel);
        self
    }

    /// Resolve a named kernel (e.g. `"stabilized"`) against this field's shape.
    pub fn with_named_kernel(mut self, name: &str, config: &ArchConfig) -> Result<Self> {
        let truncation = config.truncation(&self.shape());
        self.interaction_kernel = Some(named_kernel(name, self.dimensions.len(), Some(&truncation))?);
        Ok(self)
    }

    pub fn with_global_inhibition(mut self, global_inhibition: f64) -> Self {
        self.global_inhibition = global_inhibition;
        self
    }

    pub fn with_noise_strength(mut self, noise_strength: f64) -> Self {
        self.noise_strength = noise_strength;
        self
    }

    pub fn shape(&self) -> Vec<usize> {
        shape_from_list_of_dimensions(&self.dimensions)
    }

    pub fn domain(&self) -> Vec<[f64; 2]> {
        domain_from_list_of_dimensions(&self.dimensions)
    }
}

impl StepParameters for Field {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("dimensions", ParamValue::Dimensions(self.dimensions.clone())),
            ("resting_level", ParamValue::Float(self.resting_level)),
            ("activation_function", ParamValue::Activation(self.activation_function)),
            ("time_scale", ParamValue::Float(self.time_scale)),
            ("interaction_kernel", ParamValue::Kernel(self.interaction_kernel.clone())),
            ("global_inhibition", ParamValue::Float(self.global_inhibition)),
            ("noise_strength", ParamValue::Float(self.noise_strength)),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "dimensions" => self.dimensions = value.into_dimensions(name)?,
            "resting_level" => self.resting_level = value.into_float(name)?,
            "activation_function" => self.activation_function = value.into_activation(name)?,
            "time_scale" => self.time_scale = value.into_float(name)?,
            "interaction_kernel" => self.interaction_kernel = value.into_kernel(name)?,
            "global_inhibition" => self.global_inhibition = value.into_float(name)?,
            "noise_strength" => self.noise_strength = value.into_float(name)?,
            _ => return Err(unknown_param("Field", name)),
        }
        Ok(())
    }
}

/// Neural node: a zero-dimensional field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub resting_level: f64,
    pub time_scale: f64,
    pub self_excitation: f64,
    pub activation_function: ActivationFunction,
    pub noise_strength: f64,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            resting_level: -5.0,
            time_scale: 100.0,
            self_excitation: 0.0,
            activation_function: ActivationFunction::sigmoid(100.0),
            noise_strength: 0.2,
        }
    }
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resting_level(mut self, resting_level: f64) -> Self {
        self.resting_level = resting_level;
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    pub fn with_self_excitation(mut self, self_excitation: f64) -> Self {
        self.self_excitation = self_excitation;
        self
    }

    pub fn with_activation_function(mut self, activation_function: ActivationFunction) -> Self {
        self.activation_function = activation_function;
        self
    }

    pub fn with_noise_strength(mut self, noise_strength: f64) -> Self {
        self.noise_strength = noise_strength;
        self
    }
}

impl StepParameters for Node {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("resting_level", ParamValue::Float(self.resting_level)),
            ("time_scale", ParamValue::Float(self.time_scale)),
            ("self_excitation", ParamValue::Float(self.self_excitation)),
            ("activation_function", ParamValue::Activation(self.activation_function)),
            ("noise_strength", ParamValue::Float(self.noise_strength)),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "resting_level" => self.resting_level = value.into_float(name)?,
            "time_scale" => self.time_scale = value.into_float(name)?,
            "self_excitation" => self.self_excitation = value.into_float(name)?,
            "activation_function" => self.activation_function = value.into_activation(name)?,
            "noise_strength" => self.noise_strength = value.into_float(name)?,
            _ => return Err(unknown_param("Node", name)),
        }
        Ok(())
    }
}

// =============================================================================
// Boosts
// =============================================================================

/// Constant scalar boost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boost {
    pub value: f64,
}

impl Boost {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl StepParameters for Boost {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("value", ParamValue::Float(self.value))]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "value" => self.value = value.into_float(name)?,
            _ => return Err(unknown_param("Boost", name)),
        }
        Ok(())
    }
}

/// Piecewise-constant boost over time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedBoost {
    /// `(time, value)` breakpoints sorted by time
    pub values: Vec<(f64, f64)>,
}

impl Default for TimedBoost {
    fn default() -> Self {
        Self {
            values: vec![(0.0, 0.0)],
        }
    }
}

impl TimedBoost {
    pub fn new(mut values: Vec<(f64, f64)>) -> Self {
        values.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { values }
    }

    /// Value of the last breakpoint at or before `time` (0.0 before the first).
    pub fn value_at(&self, time: f64) -> f64 {
        self.values
            .iter()
            .take_while(|(t, _)| *t <= time)
            .last()
            .map_or(0.0, |(_, v)| *v)
    }
}

impl StepParameters for TimedBoost {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("values", ParamValue::TimedValues(self.values.clone()))]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "values" => self.values = value.into_timed_values(name)?,
            _ => return Err(unknown_param("TimedBoost", name)),
        }
        Ok(())
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Static Gaussian input pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaussInput {
    pub dimensions: Vec<Dimension>,
    pub height: f64,
    pub mean: Vec<f64>,
    pub sigmas: Vec<f64>,
}

impl GaussInput {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        let ndim = dimensions.len();
        Self {
            dimensions,
            height: 1.0,
            mean: vec![0.0; ndim],
            sigmas: vec![1.0; ndim],
        }
    }

    pub fn from_sizes(sizes: &[usize]) -> Result<Self> {
        Ok(Self::new(dimensions_from_sizes(sizes)?))
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_mean(mut self, mean: Vec<f64>) -> Result<Self> {
        self.check_axes(mean.len())?;
        self.mean = mean;
        Ok(self)
    }

    pub fn with_sigmas(mut self, sigmas: Vec<f64>) -> Result<Self> {
        self.check_axes(sigmas.len())?;
        self.sigmas = sigmas;
        Ok(self)
    }

    fn check_axes(&self, len: usize) -> Result<()> {
        if len != self.dimensions.len() {
            return Err(DynfieldError::DimensionalityMismatch {
                expected: self.dimensions.len(),
                actual: len,
            });
        }
        Ok(())
    }

    pub fn shape(&self) -> Vec<usize> {
        shape_from_list_of_dimensions(&self.dimensions)
    }

    pub fn domain(&self) -> Vec<[f64; 2]> {
        domain_from_list_of_dimensions(&self.dimensions)
    }
}

impl StepParameters for GaussInput {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("dimensions", ParamValue::Dimensions(self.dimensions.clone())),
            ("height", ParamValue::Float(self.height)),
            ("mean", ParamValue::Floats(self.mean.clone())),
            ("sigmas", ParamValue::Floats(self.sigmas.clone())),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "dimensions" => {
                self.dimensions = value.into_dimensions(name)?;
                let ndim = self.dimensions.len();
                if self.mean.len() != ndim {
                    self.mean = vec![0.0; ndim];
                }
                if self.sigmas.len() != ndim {
                    self.sigmas = vec![1.0; ndim];
                }
            }
            "height" => self.height = value.into_float(name)?,
            "mean" => {
                let mean = value.into_floats(name)?;
                self.check_axes(mean.len())?;
                self.mean = mean;
            }
            "sigmas" => {
                let sigmas = value.into_floats(name)?;
                self.check_axes(sigmas.len())?;
                self.sigmas = sigmas;
            }
            _ => return Err(unknown_param("GaussInput", name)),
        }
        Ok(())
    }
}

/// Static input from an explicit array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomInput {
    pub pattern: Tensor,
}

impl CustomInput {
    pub fn new(pattern: impl Into<Tensor>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl StepParameters for CustomInput {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("pattern", ParamValue::Tensor(self.pattern.clone()))]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "pattern" => self.pattern = value.into_tensor(name)?,
            _ => return Err(unknown_param("CustomInput", name)),
        }
        Ok(())
    }
}

/// Normally distributed noise, regenerated every time step by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseInput {
    pub dimensions: Vec<Dimension>,
    pub strength: f64,
}

impl NoiseInput {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            strength: 1.0,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn shape(&self) -> Vec<usize> {
        shape_from_list_of_dimensions(&self.dimensions)
    }
}

impl StepParameters for NoiseInput {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("dimensions", ParamValue::Dimensions(self.dimensions.clone())),
            ("strength", ParamValue::Float(self.strength)),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "dimensions" => self.dimensions = value.into_dimensions(name)?,
            "strength" => self.strength = value.into_float(name)?,
            _ => return Err(unknown_param("NoiseInput", name)),
        }
        Ok(())
    }
}

/// One explicit input pattern per time step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedCustomInput {
    pub dimensions: Vec<Dimension>,
    pub timed_custom_input: Vec<Tensor>,
}

impl TimedCustomInput {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            timed_custom_input: Vec::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: Vec<Tensor>) -> Self {
        self.timed_custom_input = patterns;
        self
    }
}

impl StepParameters for TimedCustomInput {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("dimensions", ParamValue::Dimensions(self.dimensions.clone())),
            ("timed_custom_input", ParamValue::Tensors(self.timed_custom_input.clone())),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "dimensions" => self.dimensions = value.into_dimensions(name)?,
            "timed_custom_input" => self.timed_custom_input = value.into_tensors(name)?,
            _ => return Err(unknown_param("TimedCustomInput", name)),
        }
        Ok(())
    }
}

/// Passes its input through during `[min_time, max_time]`, zero otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedGate {
    pub dimensions: Vec<Dimension>,
    pub min_time: f64,
    /// `None` keeps the gate open indefinitely
    pub max_time: Option<f64>,
}

impl TimedGate {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            min_time: 0.0,
            max_time: None,
        }
    }

    pub fn with_window(mut self, min_time: f64, max_time: Option<f64>) -> Self {
        self.min_time = min_time;
        self.max_time = max_time;
        self
    }

    pub fn is_open(&self, time: f64) -> bool {
        time >= self.min_time && self.max_time.map_or(true, |max| time <= max)
    }

    pub fn shape(&self) -> Vec<usize> {
        shape_from_list_of_dimensions(&self.dimensions)
    }
}

impl StepParameters for TimedGate {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("dimensions", ParamValue::Dimensions(self.dimensions.clone())),
            ("min_time", ParamValue::Float(self.min_time)),
            ("max_time", ParamValue::OptionalFloat(self.max_time)),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "dimensions" => self.dimensions = value.into_dimensions(name)?,
            "min_time" => self.min_time = value.into_float(name)?,
            "max_time" => self.max_time = value.into_optional_float(name)?,
            _ => return Err(unknown_param("TimedGate", name)),
        }
        Ok(())
    }
}

/// Image read from a file by the host. Decoding is not done here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub filename: String,
    pub color_space: ColorSpace,
    /// Target `(width, height)` the host resizes to, if any
    pub shape: Option<Vec<usize>>,
}

impl Image {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            color_space: ColorSpace::Hsv,
            shape: None,
        }
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn with_shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = Some(shape);
        self
    }
}

impl StepParameters for Image {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("filename", ParamValue::Text(self.filename.clone())),
            ("color_space", ParamValue::ColorSpace(self.color_space)),
            ("shape", ParamValue::OptionalShape(self.shape.clone())),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "filename" => self.filename = value.into_text(name)?,
            "color_space" => self.color_space = value.into_color_space(name)?,
            "shape" => self.shape = value.into_optional_shape(name)?,
            _ => return Err(unknown_param("Image", name)),
        }
        Ok(())
    }
}

/// Constant scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scalar {
    pub value: f64,
}

impl Default for Scalar {
    fn default() -> Self {
        Self { value: 1.0 }
    }
}

impl Scalar {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl StepParameters for Scalar {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("value", ParamValue::Float(self.value))]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "value" => self.value = value.into_float(name)?,
            _ => return Err(unknown_param("Scalar", name)),
        }
        Ok(())
    }
}

// =============================================================================
// Transformations
// =============================================================================

/// Multiplies its input by a scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarMultiplication {
    pub shape: Vec<usize>,
    pub scalar: f64,
}

impl ScalarMultiplication {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape, scalar: 1.0 }
    }

    pub fn with_scalar(mut self, scalar: f64) -> Self {
        self.scalar = scalar;
        self
    }
}

impl StepParameters for ScalarMultiplication {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("shape", ParamValue::Shape(self.shape.clone())),
            ("scalar", ParamValue::Float(self.scalar)),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "shape" => self.shape = value.into_shape(name)?,
            "scalar" => self.scalar = value.into_float(name)?,
            _ => return Err(unknown_param("ScalarMultiplication", name)),
        }
        Ok(())
    }
}

/// Turns a rate matrix into a 3D space code: `T(i, j, k) = value(i, j)` when
/// `map(i, j)` falls into bin `k` of `[lower_limit, upper_limit]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateMatrixToSpaceCode {
    pub number_of_bins: usize,
    pub lower_limit: f64,
    pub upper_limit: f64,
}

impl Default for RateMatrixToSpaceCode {
    fn default() -> Self {
        Self {
            number_of_bins: 10,
            lower_limit: 0.0,
            upper_limit: 1.0,
        }
    }
}

impl RateMatrixToSpaceCode {
    pub fn new(number_of_bins: usize, lower_limit: f64, upper_limit: f64) -> Self {
        Self {
            number_of_bins,
            lower_limit,
            upper_limit,
        }
    }

    /// Bin a map value falls into, or `None` outside the limits.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if self.number_of_bins == 0 || value < self.lower_limit || value > self.upper_limit {
            return None;
        }
        let width = (self.upper_limit - self.lower_limit) / self.number_of_bins as f64;
        let bin = ((value - self.lower_limit) / width).floor() as usize;
        Some(bin.min(self.number_of_bins - 1))
    }
}

impl StepParameters for RateMatrixToSpaceCode {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("number_of_bins", ParamValue::Count(self.number_of_bins)),
            ("lower_limit", ParamValue::Float(self.lower_limit)),
            ("upper_limit", ParamValue::Float(self.upper_limit)),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "number_of_bins" => self.number_of_bins = value.into_count(name)?,
            "lower_limit" => self.lower_limit = value.into_float(name)?,
            "upper_limit" => self.upper_limit = value.into_float(name)?,
            _ => return Err(unknown_param("RateMatrixToSpaceCode", name)),
        }
        Ok(())
    }
}

/// Stack of equally shaped fields along a new leading axis.
///
/// Members are referenced by name so that stacks compare equal across
/// independently built structures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStack {
    pub fields: Vec<String>,
    /// Dimensions shared by every member
    pub dimensions: Vec<Dimension>,
}

impl FieldStack {
    pub fn new(fields: Vec<String>, dimensions: Vec<Dimension>) -> Self {
        Self { fields, dimensions }
    }
}

impl StepParameters for FieldStack {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("fields", ParamValue::Names(self.fields.clone())),
            ("dimensions", ParamValue::Dimensions(self.dimensions.clone())),
        ]
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "fields" => self.fields = value.into_names(name)?,
            "dimensions" => self.dimensions = value.into_dimensions(name)?,
            _ => return Err(unknown_param("FieldStack", name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_defaults() {
        let field = Field::from_sizes(&[51, 51]).unwrap();
        assert_eq!(field.resting_level, -5.0);
        assert_eq!(field.time_scale, 100.0);
        assert_eq!(field.noise_strength, 0.1);
        assert_eq!(field.activation_function, ActivationFunction::sigmoid(100.0));
        assert!(field.interaction_kernel.is_none());
        assert_eq!(field.shape(), vec![51, 51]);
        assert_eq!(field.domain(), vec![[0.0, 50.0], [0.0, 50.0]]);
    }

    #[test]
    fn test_field_named_kernel() {
        let config = ArchConfig::default();
        let field = Field::from_sizes(&[25, 25, 5])
            .unwrap()
            .with_named_kernel("stabilized", &config)
            .unwrap();
        let kernel = field.interaction_kernel.unwrap();
        assert_eq!(kernel.dimensionality(), 3);
        assert!(kernel.range().is_some());

        let flat = Field::from_sizes(&[25, 25]).unwrap();
        assert!(flat.with_named_kernel("stabilized", &config).is_err());
    }

    #[test]
    fn test_set_param_coerces_and_rejects() {
        let mut node = Node::new();
        node.set_param("time_scale", ParamValue::Count(20)).unwrap();
        assert_eq!(node.time_scale, 20.0);

        assert!(node.set_param("dimensions", ParamValue::Shape(vec![3])).is_err());
        assert!(node.set_param("resting_level", ParamValue::Text("low".into())).is_err());
    }

    #[test]
    fn test_param_lookup() {
        let boost = Boost::new(4.5);
        assert_eq!(boost.param("value"), Some(ParamValue::Float(4.5)));
        assert_eq!(boost.param("height"), None);
    }

    #[test]
    fn test_timed_boost_value_at() {
        let boost = TimedBoost::new(vec![(100.0, 5.0), (0.0, 1.0), (50.0, 3.0)]);
        assert_eq!(boost.value_at(-1.0), 0.0);
        assert_eq!(boost.value_at(0.0), 1.0);
        assert_eq!(boost.value_at(75.0), 3.0);
        assert_eq!(boost.value_at(1000.0), 5.0);
    }

    #[test]
    fn test_gauss_input_axes_checked() {
        let input = GaussInput::from_sizes(&[11, 11]).unwrap();
        assert_eq!(input.mean, vec![0.0, 0.0]);
        assert_eq!(input.sigmas, vec![1.0, 1.0]);
        assert!(input.clone().with_mean(vec![3.0]).is_err());
        assert!(input.with_sigmas(vec![2.0, 2.0]).is_ok());
    }

    #[test]
    fn test_gauss_input_set_param_checks_axes() {
        let mut input = GaussInput::from_sizes(&[11]).unwrap();
        let err = input
            .set_param("mean", ParamValue::Floats(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, DynfieldError::DimensionalityMismatch { expected: 1, actual: 3 }));
        assert!(input.set_param("sigmas", ParamValue::Floats(vec![])).is_err());
        assert_eq!(input.mean, vec![0.0]);
        assert_eq!(input.sigmas, vec![1.0]);

        input.set_param("mean", ParamValue::Float(4.0)).unwrap();
        assert_eq!(input.mean, vec![4.0]);

        // New dimensions first, then a matching mean
        input.set_param("dimensions", ParamValue::Shape(vec![5, 5])).unwrap();
        input.set_param("mean", ParamValue::Floats(vec![2.0, 2.0])).unwrap();
        assert_eq!(input.mean, vec![2.0, 2.0]);
    }

    #[test]
    fn test_timed_gate_window() {
        let dims = dimensions_from_sizes(&[5]).unwrap();
        let gate = TimedGate::new(dims.clone()).with_window(10.0, Some(20.0));
        assert!(!gate.is_open(5.0));
        assert!(gate.is_open(15.0));
        assert!(!gate.is_open(25.0));
        assert!(TimedGate::new(dims).is_open(1e9));
    }

    #[test]
    fn test_rate_matrix_bins() {
        let code = RateMatrixToSpaceCode::default();
        assert_eq!(code.bin_index(0.0), Some(0));
        assert_eq!(code.bin_index(0.55), Some(5));
        assert_eq!(code.bin_index(1.0), Some(9));
        assert_eq!(code.bin_index(1.5), None);
    }
}
