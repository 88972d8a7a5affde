//! Simulator callback contract
//!
//! The numeric simulator lives outside this crate. After a hot reload
//! changes a step's parameters, the merge engine tells the simulator to
//! rebuild whatever it derived from that step.

use crate::steps::{Step, StepId};

/// Callbacks a simulator implements to follow live architecture changes.
///
/// For every changed step the calls arrive in this order:
/// 1. [`prepare_constants_and_variables_for_step`](Simulator::prepare_constants_and_variables_for_step)
/// 2. [`prepare_time_invariant_tensors_for_step`](Simulator::prepare_time_invariant_tensors_for_step)
/// 3. [`reset_step_to_initial_value`](Simulator::reset_step_to_initial_value), static steps only
pub trait Simulator {
    fn prepare_constants_and_variables_for_step(&mut self, id: StepId, step: &Step);

    fn prepare_time_invariant_tensors_for_step(&mut self, id: StepId, step: &Step);

    fn reset_step_to_initial_value(&mut self, id: StepId, step: &Step);
}

/// Simulator that ignores every callback (e.g. for offline validation).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSimulator;

impl Simulator for NullSimulator {
    fn prepare_constants_and_variables_for_step(&mut self, _id: StepId, _step: &Step) {}

    fn prepare_time_invariant_tensors_for_step(&mut self, _id: StepId, _step: &Step) {}

    fn reset_step_to_initial_value(&mut self, _id: StepId, _step: &Step) {}
}
