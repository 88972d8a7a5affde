//! Connections between steps
//!
//! A connection feeds the output of one step into another. Direct
//! connections copy (and possibly contract or expand) the input; synaptic
//! connections additionally pass it through an activation function and
//! weight it with a kernel and/or pointwise pattern.

use crate::activation::ActivationFunction;
use crate::steps::StepId;
use crate::tensor::Tensor;
use crate::weights::Weights;
use serde::Serialize;

/// How synaptic input is normalized. Sum is the only supported mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum NormalizationType {
    #[default]
    Sum,
}

/// Synaptic part of a connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynapticParams {
    /// Convolution kernel
    pub kernel_weights: Option<Weights>,
    /// Elementwise weights
    pub pointwise_weights: Option<Weights>,
    /// Applied to the input before weighting
    pub activation_function: ActivationFunction,
    pub normalization_type: NormalizationType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConnectionKind {
    Direct,
    Synaptic(SynapticParams),
}

/// Connection from `input_step` into `output_step`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub name: String,
    pub input_step: StepId,
    pub output_step: StepId,
    /// Input axes summed away
    pub contract_dimensions: Option<Vec<usize>>,
    /// Weights applied along contracted axes
    pub contraction_weights: Option<Tensor>,
    /// Output axes the input is broadcast along
    pub expand_dimensions: Option<Vec<usize>>,
    pub kind: ConnectionKind,
}

impl Connection {
    pub fn direct(input_step: StepId, output_step: StepId) -> Self {
        Self {
            name: "Direct Connection".to_string(),
            input_step,
            output_step,
            contract_dimensions: None,
            contraction_weights: None,
            expand_dimensions: None,
            kind: ConnectionKind::Direct,
        }
    }

    pub fn synaptic(input_step: StepId, output_step: StepId, params: SynapticParams) -> Self {
        Self {
            name: "Synaptic Connection".to_string(),
            kind: ConnectionKind::Synaptic(params),
            ..Self::direct(input_step, output_step)
        }
    }

    /// Position of the input step in its structure.
    pub fn input_step_index(&self) -> usize {
        self.input_step.index()
    }

    pub fn is_synaptic(&self) -> bool {
        matches!(self.kind, ConnectionKind::Synaptic(_))
    }

    pub fn synaptic_params(&self) -> Option<&SynapticParams> {
        match &self.kind {
            ConnectionKind::Synaptic(params) => Some(params),
            ConnectionKind::Direct => None,
        }
    }

    pub fn kernel_weights(&self) -> Option<&Weights> {
        self.synaptic_params().and_then(|p| p.kernel_weights.as_ref())
    }

    pub fn pointwise_weights(&self) -> Option<&Weights> {
        self.synaptic_params().and_then(|p| p.pointwise_weights.as_ref())
    }

    pub fn activation_function(&self) -> Option<ActivationFunction> {
        self.synaptic_params().map(|p| p.activation_function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let direct = Connection::direct(StepId(0), StepId(1));
        assert_eq!(direct.name, "Direct Connection");
        assert!(!direct.is_synaptic());
        assert!(direct.activation_function().is_none());

        let synaptic = Connection::synaptic(
            StepId(2),
            StepId(1),
            SynapticParams {
                kernel_weights: Some(Weights::Scalar(2.0)),
                pointwise_weights: None,
                activation_function: ActivationFunction::broad_sigmoid(),
                normalization_type: NormalizationType::Sum,
            },
        );
        assert_eq!(synaptic.name, "Synaptic Connection");
        assert_eq!(synaptic.input_step_index(), 2);
        assert_eq!(synaptic.kernel_weights(), Some(&Weights::Scalar(2.0)));
    }
}
