//! Parameter descriptors
//!
//! Every step variant exposes its settable parameters as a fixed list of
//! `(name, ParamValue)` pairs. Change notification, hot-reload diffing,
//! snapshots, and the architecture parser all go through this list; nothing
//! inspects step structs by reflection.

use crate::activation::ActivationFunction;
use crate::dimension::Dimension;
use crate::error::{DynfieldError, Result};
use crate::tensor::Tensor;
use crate::weights::WeightPattern;
use serde::Serialize;

/// Color space an image step converts into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ColorSpace {
    #[default]
    Hsv,
    Rgb,
}

impl ColorSpace {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hsv" => Some(Self::Hsv),
            "rgb" => Some(Self::Rgb),
            _ => None,
        }
    }
}

/// Value of a single step parameter.
///
/// Equality is plain value equality; nested patterns compare structurally
/// but are always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParamValue {
    Bool(bool),
    Float(f64),
    OptionalFloat(Option<f64>),
    Count(usize),
    Text(String),
    Floats(Vec<f64>),
    Shape(Vec<usize>),
    OptionalShape(Option<Vec<usize>>),
    Dimensions(Vec<Dimension>),
    Activation(ActivationFunction),
    Kernel(Option<WeightPattern>),
    Tensor(Tensor),
    Tensors(Vec<Tensor>),
    /// `(time, value)` breakpoints, sorted by time
    TimedValues(Vec<(f64, f64)>),
    Names(Vec<String>),
    ColorSpace(ColorSpace),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Float(_) => "float",
            Self::OptionalFloat(_) => "optional float",
            Self::Count(_) => "count",
            Self::Text(_) => "text",
            Self::Floats(_) => "float list",
            Self::Shape(_) => "shape",
            Self::OptionalShape(_) => "optional shape",
            Self::Dimensions(_) => "dimensions",
            Self::Activation(_) => "activation function",
            Self::Kernel(_) => "kernel",
            Self::Tensor(_) => "tensor",
            Self::Tensors(_) => "tensor list",
            Self::TimedValues(_) => "timed values",
            Self::Names(_) => "name list",
            Self::ColorSpace(_) => "color space",
        }
    }

    fn mismatch(self, param: &str, expected: &str) -> DynfieldError {
        DynfieldError::InvalidArgument(format!(
            "parameter '{}' expects {}, got {}",
            param,
            expected,
            self.type_name()
        ))
    }

    /// Integers are accepted wherever a float is required.
    pub fn into_float(self, param: &str) -> Result<f64> {
        match self {
            Self::Float(v) => Ok(v),
            Self::Count(v) => Ok(v as f64),
            other => Err(other.mismatch(param, "float")),
        }
    }

    pub fn into_optional_float(self, param: &str) -> Result<Option<f64>> {
        match self {
            Self::OptionalFloat(v) => Ok(v),
            Self::Float(v) => Ok(Some(v)),
            Self::Count(v) => Ok(Some(v as f64)),
            other => Err(other.mismatch(param, "optional float")),
        }
    }

    pub fn into_bool(self, param: &str) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(v),
            other => Err(other.mismatch(param, "bool")),
        }
    }

    pub fn into_count(self, param: &str) -> Result<usize> {
        match self {
            Self::Count(v) => Ok(v),
            other => Err(other.mismatch(param, "count")),
        }
    }

    pub fn into_text(self, param: &str) -> Result<String> {
        match self {
            Self::Text(v) => Ok(v),
            other => Err(other.mismatch(param, "text")),
        }
    }

    /// A single number is accepted as a one-element list.
    pub fn into_floats(self, param: &str) -> Result<Vec<f64>> {
        match self {
            Self::Floats(v) => Ok(v),
            Self::Float(v) => Ok(vec![v]),
            Self::Count(v) => Ok(vec![v as f64]),
            Self::Shape(v) => Ok(v.into_iter().map(|x| x as f64).collect()),
            other => Err(other.mismatch(param, "float list")),
        }
    }

    pub fn into_shape(self, param: &str) -> Result<Vec<usize>> {
        match self {
            Self::Shape(v) => Ok(v),
            other => Err(other.mismatch(param, "shape")),
        }
    }

    pub fn into_optional_shape(self, param: &str) -> Result<Option<Vec<usize>>> {
        match self {
            Self::OptionalShape(v) => Ok(v),
            Self::Shape(v) => Ok(Some(v)),
            other => Err(other.mismatch(param, "optional shape")),
        }
    }

    /// Plain sizes are expanded with [`Dimension::from_size`].
    pub fn into_dimensions(self, param: &str) -> Result<Vec<Dimension>> {
        match self {
            Self::Dimensions(v) => Ok(v),
            Self::Shape(sizes) => crate::dimension::dimensions_from_sizes(&sizes),
            other => Err(other.mismatch(param, "dimensions")),
        }
    }

    pub fn into_activation(self, param: &str) -> Result<ActivationFunction> {
        match self {
            Self::Activation(v) => Ok(v),
            other => Err(other.mismatch(param, "activation function")),
        }
    }

    pub fn into_kernel(self, param: &str) -> Result<Option<WeightPattern>> {
        match self {
            Self::Kernel(v) => Ok(v),
            other => Err(other.mismatch(param, "kernel")),
        }
    }

    pub fn into_tensor(self, param: &str) -> Result<Tensor> {
        match self {
            Self::Tensor(v) => Ok(v),
            Self::Floats(v) => Ok(Tensor::from_vec(v)),
            other => Err(other.mismatch(param, "tensor")),
        }
    }

    pub fn into_tensors(self, param: &str) -> Result<Vec<Tensor>> {
        match self {
            Self::Tensors(v) => Ok(v),
            other => Err(other.mismatch(param, "tensor list")),
        }
    }

    /// Breakpoints are sorted by time on the way in.
    pub fn into_timed_values(self, param: &str) -> Result<Vec<(f64, f64)>> {
        match self {
            Self::TimedValues(mut v) => {
                v.sort_by(|a, b| a.0.total_cmp(&b.0));
                Ok(v)
            }
            other => Err(other.mismatch(param, "timed values")),
        }
    }

    pub fn into_names(self, param: &str) -> Result<Vec<String>> {
        match self {
            Self::Names(v) => Ok(v),
            other => Err(other.mismatch(param, "name list")),
        }
    }

    pub fn into_color_space(self, param: &str) -> Result<ColorSpace> {
        match self {
            Self::ColorSpace(v) => Ok(v),
            Self::Text(s) => ColorSpace::parse(&s).ok_or_else(|| {
                DynfieldError::InvalidArgument(format!("unknown color space: {}", s))
            }),
            other => Err(other.mismatch(param, "color space")),
        }
    }
}

/// Fixed parameter list of a step variant.
pub trait StepParameters {
    /// All settable parameters, in declaration order.
    fn params(&self) -> Vec<(&'static str, ParamValue)>;

    /// Store a new value. Fails for unknown names and incompatible types.
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()>;

    /// Current value of one parameter.
    fn param(&self, name: &str) -> Option<ParamValue> {
        self.params()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

pub(crate) fn unknown_param(kind: &str, name: &str) -> DynfieldError {
    DynfieldError::InvalidArgument(format!("{} has no parameter '{}'", kind, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_coerces_to_float() {
        assert_eq!(ParamValue::Count(100).into_float("time_scale").unwrap(), 100.0);
        assert!(ParamValue::Text("x".into()).into_float("time_scale").is_err());
    }

    #[test]
    fn test_timed_values_sorted() {
        let v = ParamValue::TimedValues(vec![(10.0, 1.0), (0.0, 0.0), (5.0, 2.0)])
            .into_timed_values("values")
            .unwrap();
        assert_eq!(v, vec![(0.0, 0.0), (5.0, 2.0), (10.0, 1.0)]);
    }

    #[test]
    fn test_shape_expands_to_dimensions() {
        let dims = ParamValue::Shape(vec![11, 21]).into_dimensions("dimensions").unwrap();
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[1].size(), 21);
    }

    #[test]
    fn test_mismatch_names_parameter() {
        let err = ParamValue::Bool(true).into_shape("shape").unwrap_err();
        assert!(err.to_string().contains("'shape'"));
    }
}
