//! Neural structure: the architecture graph
//!
//! Owns every step and, per step, the list of connections feeding into it.
//! Steps are addressed by [`StepId`], an index that never changes because
//! steps are never removed. Names are the identity key: no two registered
//! steps share one.

use crate::activation::ActivationFunction;
use crate::connection::{Connection, NormalizationType, SynapticParams};
use crate::dimension::{shape_from_list_of_dimensions, Dimension};
use crate::error::{DynfieldError, Result};
use crate::steps::{FieldStack, ParamValue, Step, StepId, StepKind};
use crate::tensor::Tensor;
use crate::weights::Weights;
use std::collections::HashMap;
use std::fmt;

/// Called after a step is registered.
pub type AddStepObserver = Box<dyn Fn(StepId, &Step) + Send + Sync>;
/// Called after a connection is registered.
pub type AddConnectionObserver = Box<dyn Fn(&Connection) + Send + Sync>;

/// One end of a connection: a registered step or one to register on connect.
pub enum Endpoint {
    Id(StepId),
    Step(Step),
}

impl From<StepId> for Endpoint {
    fn from(id: StepId) -> Self {
        Self::Id(id)
    }
}

impl From<Step> for Endpoint {
    fn from(step: Step) -> Self {
        Self::Step(step)
    }
}

/// Optional connection parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectOptions {
    pub kernel_weights: Option<Weights>,
    pub pointwise_weights: Option<Weights>,
    pub activation_function: Option<ActivationFunction>,
    pub contract_dimensions: Option<Vec<usize>>,
    pub contraction_weights: Option<Tensor>,
    pub expand_dimensions: Option<Vec<usize>>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kernel(mut self, weights: impl Into<Weights>) -> Self {
        self.kernel_weights = Some(weights.into());
        self
    }

    pub fn pointwise(mut self, weights: impl Into<Weights>) -> Self {
        self.pointwise_weights = Some(weights.into());
        self
    }

    pub fn activation(mut self, activation_function: ActivationFunction) -> Self {
        self.activation_function = Some(activation_function);
        self
    }

    pub fn contract(mut self, dimensions: Vec<usize>) -> Self {
        self.contract_dimensions = Some(dimensions);
        self
    }

    pub fn contraction_weights(mut self, weights: impl Into<Tensor>) -> Self {
        self.contraction_weights = Some(weights.into());
        self
    }

    pub fn expand(mut self, dimensions: Vec<usize>) -> Self {
        self.expand_dimensions = Some(dimensions);
        self
    }

    fn has_weights(&self) -> bool {
        self.kernel_weights.is_some() || self.pointwise_weights.is_some()
    }
}

/// Architecture graph
#[derive(Default)]
pub struct NeuralStructure {
    steps: Vec<Step>,
    /// Parallel to `steps`
    connections_into_steps: Vec<Vec<Connection>>,
    step_indices_by_name: HashMap<String, StepId>,
    /// Uses of each requested name, for unique naming
    name_counters: HashMap<String, usize>,
    add_step_observers: Vec<AddStepObserver>,
    add_connection_observers: Vec<AddConnectionObserver>,
}

impl NeuralStructure {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Make `name` unique within this structure.
    ///
    /// The first use returns the name unchanged, the n-th returns `"{name} {n}"`.
    pub fn unique_name(&mut self, name: &str) -> String {
        let counter = self.name_counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        let mut candidate = if *counter == 1 {
            name.to_string()
        } else {
            format!("{} {}", name, counter)
        };
        while self.step_indices_by_name.contains_key(&candidate) {
            *counter += 1;
            candidate = format!("{} {}", name, counter);
        }
        candidate
    }

    /// Register a step of the given kind under its default name.
    pub fn create(&mut self, kind: impl Into<StepKind>) -> StepId {
        self.create_step(Step::from_kind(kind))
    }

    /// Register a step of the given kind under a (uniquified) name.
    pub fn create_named(&mut self, name: &str, kind: impl Into<StepKind>) -> StepId {
        self.create_step(Step::new(name, kind))
    }

    /// Register a prebuilt step, uniquifying its name.
    pub fn create_step(&mut self, mut step: Step) -> StepId {
        let name = self.unique_name(step.name());
        if name != step.name() {
            step.set_name(name);
        }
        self.insert(step)
    }

    /// Register a step under its exact name.
    pub fn add_step(&mut self, step: Step) -> Result<StepId> {
        if self.step_indices_by_name.contains_key(step.name()) {
            return Err(DynfieldError::DuplicateStep(step.name().to_string()));
        }
        self.name_counters.entry(step.name().to_string()).or_insert(1);
        Ok(self.insert(step))
    }

    fn insert(&mut self, step: Step) -> StepId {
        let id = StepId(self.steps.len());
        self.step_indices_by_name.insert(step.name().to_string(), id);
        self.steps.push(step);
        self.connections_into_steps.push(Vec::new());

        let step = &self.steps[id.0];
        for observer in &self.add_step_observers {
            observer(id, step);
        }
        id
    }

    /// Stack equally shaped fields, looked up by name, into one step.
    pub fn create_field_stack(&mut self, name: &str, field_names: &[&str]) -> Result<StepId> {
        let mut dimensions: Option<Vec<Dimension>> = None;
        for field_name in field_names {
            let step = self.get_step_by_name(field_name)?;
            let field = match step.kind() {
                StepKind::Field(field) => field,
                other => {
                    return Err(DynfieldError::InvalidArgument(format!(
                        "field stack member '{}' is a {}, not a Field",
                        field_name,
                        other.kind_name()
                    )))
                }
            };
            if let Some(dims) = &dimensions {
                let expected = shape_from_list_of_dimensions(dims);
                if field.shape() != expected {
                    return Err(DynfieldError::InvalidArgument(format!(
                        "field stack member '{}' has shape {:?}, expected {:?}",
                        field_name,
                        field.shape(),
                        expected
                    )));
                }
            } else {
                dimensions = Some(field.dimensions.clone());
            }
        }
        let dimensions = dimensions.ok_or_else(|| {
            DynfieldError::InvalidArgument("field stack needs at least one field".to_string())
        })?;
        let fields = field_names.iter().map(|s| s.to_string()).collect();
        Ok(self.create_named(name, FieldStack::new(fields, dimensions)))
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Connect two steps, registering unregistered endpoints.
    ///
    /// Field to Node with no contraction given contracts every field axis.
    /// The connection is synaptic when weights are supplied or both ends are
    /// fields or nodes; otherwise it is direct. A synaptic connection without
    /// an activation function inherits the input's, or a broad sigmoid.
    pub fn connect(
        &mut self,
        input: impl Into<Endpoint>,
        output: impl Into<Endpoint>,
        options: ConnectOptions,
    ) -> Result<&Connection> {
        let input = input.into();
        let output = output.into();

        let input_kind = self.endpoint_kind(&input)?;
        let output_kind = self.endpoint_kind(&output)?;
        let input_dim = input_kind.dimensionality();
        let input_dynamic = input_kind.is_dynamic();
        let output_dynamic = output_kind.is_dynamic();
        let input_activation = input_kind.activation_function();

        let contract_dimensions = inferred_contraction(input_kind, output_kind, &options);
        if let Some(dims) = &contract_dimensions {
            check_contraction(dims, input_dim)?;
        }
        self.check_new_endpoints(&input, &output)?;

        let input_id = self.register_endpoint(input)?;
        let output_id = self.register_endpoint(output)?;

        let mut connection = if options.has_weights() || (input_dynamic && output_dynamic) {
            Connection::synaptic(
                input_id,
                output_id,
                SynapticParams {
                    activation_function: options
                        .activation_function
                        .or(input_activation)
                        .unwrap_or_else(ActivationFunction::broad_sigmoid),
                    kernel_weights: options.kernel_weights,
                    pointwise_weights: options.pointwise_weights,
                    normalization_type: NormalizationType::Sum,
                },
            )
        } else {
            Connection::direct(input_id, output_id)
        };
        connection.contract_dimensions = contract_dimensions;
        connection.contraction_weights = options.contraction_weights;
        connection.expand_dimensions = options.expand_dimensions;

        self.connections_into_steps[output_id.0].push(connection);
        let incoming = &self.connections_into_steps[output_id.0];
        let connection = &incoming[incoming.len() - 1];
        for observer in &self.add_connection_observers {
            observer(connection);
        }
        Ok(connection)
    }

    /// Like [`connect`](Self::connect), but also rejects a source with more
    /// axes than the target unless enough of them end up contracted. The
    /// Field to Node default counts as contracting every axis.
    pub fn connect_checked(
        &mut self,
        input: impl Into<Endpoint>,
        output: impl Into<Endpoint>,
        options: ConnectOptions,
    ) -> Result<&Connection> {
        let input = input.into();
        let output = output.into();
        let input_kind = self.endpoint_kind(&input)?;
        let output_kind = self.endpoint_kind(&output)?;
        let contracted = inferred_contraction(input_kind, output_kind, &options).map_or(0, |d| d.len());
        check_contraction_count(input_kind.dimensionality(), output_kind.dimensionality(), contracted)?;
        self.connect(input, output, options)
    }

    fn endpoint_kind<'a>(&'a self, endpoint: &'a Endpoint) -> Result<&'a StepKind> {
        match endpoint {
            Endpoint::Id(id) => self.try_step(*id).map(Step::kind),
            Endpoint::Step(step) => Ok(step.kind()),
        }
    }

    /// Unregistered endpoints must not collide by name, with the structure or each other.
    fn check_new_endpoints(&self, input: &Endpoint, output: &Endpoint) -> Result<()> {
        let mut names = Vec::new();
        for endpoint in [input, output] {
            if let Endpoint::Step(step) = endpoint {
                if self.step_indices_by_name.contains_key(step.name()) || names.contains(&step.name()) {
                    return Err(DynfieldError::DuplicateStep(step.name().to_string()));
                }
                names.push(step.name());
            }
        }
        Ok(())
    }

    fn register_endpoint(&mut self, endpoint: Endpoint) -> Result<StepId> {
        match endpoint {
            Endpoint::Id(id) => Ok(id),
            Endpoint::Step(step) => self.add_step(step),
        }
    }

    pub fn register_add_step_observer(&mut self, observer: impl Fn(StepId, &Step) + Send + Sync + 'static) {
        self.add_step_observers.push(Box::new(observer));
    }

    pub fn register_add_connection_observer(
        &mut self,
        observer: impl Fn(&Connection) + Send + Sync + 'static,
    ) {
        self.add_connection_observers.push(Box::new(observer));
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Ids of all steps in registration order.
    pub fn step_ids(&self) -> impl Iterator<Item = StepId> {
        (0..self.steps.len()).map(StepId)
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.0)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.get_mut(id.0)
    }

    fn try_step(&self, id: StepId) -> Result<&Step> {
        self.step(id).ok_or_else(|| {
            DynfieldError::InvalidArgument(format!("step {} is not part of this structure", id))
        })
    }

    fn try_step_mut(&mut self, id: StepId) -> Result<&mut Step> {
        let len = self.steps.len();
        self.steps.get_mut(id.0).ok_or_else(|| {
            DynfieldError::InvalidArgument(format!(
                "step {} is not part of this structure ({} steps)",
                id, len
            ))
        })
    }

    pub fn get_step_by_name(&self, name: &str) -> Result<&Step> {
        let id = self.get_step_index_by_name(name)?;
        self.try_step(id)
    }

    pub fn get_step_by_name_mut(&mut self, name: &str) -> Result<&mut Step> {
        let id = self.get_step_index_by_name(name)?;
        self.try_step_mut(id)
    }

    pub fn get_step_index_by_name(&self, name: &str) -> Result<StepId> {
        self.step_indices_by_name
            .get(name)
            .copied()
            .ok_or_else(|| DynfieldError::NotFound(format!("no step named '{}'", name)))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.step_indices_by_name.contains_key(name)
    }

    pub fn connections_into_steps(&self) -> &[Vec<Connection>] {
        &self.connections_into_steps
    }

    /// Connections feeding into `id` (empty for unknown ids).
    pub fn connections_into(&self, id: StepId) -> &[Connection] {
        self.connections_into_steps
            .get(id.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every connection, grouped by output step.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections_into_steps.iter().flatten()
    }

    /// Steps feeding into `id`, in connection order.
    pub fn input_steps(&self, id: StepId) -> Vec<StepId> {
        self.connections_into(id).iter().map(|c| c.input_step).collect()
    }

    /// First connection from `input_name` into `output_name`.
    pub fn get_connection_by_step_names(&self, input_name: &str, output_name: &str) -> Result<&Connection> {
        let input = self.get_step_index_by_name(input_name)?;
        let output = self.get_step_index_by_name(output_name)?;
        self.connections_into(output)
            .iter()
            .find(|c| c.input_step == input)
            .ok_or_else(|| {
                DynfieldError::NotFound(format!(
                    "no connection from '{}' into '{}'",
                    input_name, output_name
                ))
            })
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Set a parameter on a registered step. Observers of the step fire.
    pub fn set_param(&mut self, id: StepId, name: &str, value: ParamValue) -> Result<()> {
        self.try_step_mut(id)?.set_param(name, value)
    }

    /// Rename a step, keeping the name index consistent.
    pub fn rename_step(&mut self, id: StepId, new_name: &str) -> Result<()> {
        let old_name = self.try_step(id)?.name().to_string();
        if old_name == new_name {
            return Ok(());
        }
        if self.step_indices_by_name.contains_key(new_name) {
            return Err(DynfieldError::DuplicateStep(new_name.to_string()));
        }
        self.step_indices_by_name.remove(&old_name);
        self.step_indices_by_name.insert(new_name.to_string(), id);
        self.name_counters.entry(new_name.to_string()).or_insert(1);
        self.steps[id.0].set_name(new_name.to_string());
        Ok(())
    }
}

impl fmt::Debug for NeuralStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuralStructure")
            .field("steps", &self.steps)
            .field("connections_into_steps", &self.connections_into_steps)
            .field("add_step_observers", &self.add_step_observers.len())
            .field("add_connection_observers", &self.add_connection_observers.len())
            .finish()
    }
}

/// Explicit contraction axes, or every input axis for Field to Node.
fn inferred_contraction(
    input_kind: &StepKind,
    output_kind: &StepKind,
    options: &ConnectOptions,
) -> Option<Vec<usize>> {
    match (&options.contract_dimensions, input_kind, output_kind) {
        (Some(dims), _, _) => Some(dims.clone()),
        (None, StepKind::Field(_), StepKind::Node(_)) => Some((0..input_kind.dimensionality()).collect()),
        _ => None,
    }
}

fn check_contraction_count(source_dim: usize, target_dim: usize, contracted: usize) -> Result<()> {
    if source_dim > target_dim && source_dim.saturating_sub(contracted) != target_dim {
        return Err(DynfieldError::ContractionMismatch {
            source_dim,
            target_dim,
            required: source_dim - target_dim,
        });
    }
    Ok(())
}

fn check_contraction(dims: &[usize], input_dim: usize) -> Result<()> {
    for (i, &d) in dims.iter().enumerate() {
        if d >= input_dim {
            return Err(DynfieldError::InvalidArgument(format!(
                "cannot contract dimension {} of a {}-dimensional input",
                d, input_dim
            )));
        }
        if dims[..i].contains(&d) {
            return Err(DynfieldError::InvalidArgument(format!(
                "dimension {} contracted twice",
                d
            )));
        }
    }
    Ok(())
}

/// Connect two steps, checking that enough input axes are contracted.
///
/// Unlike [`NeuralStructure::connect`], no contraction is inferred: a source
/// with more axes than the target must name `source - target` of them.
pub fn connect(
    ns: &mut NeuralStructure,
    source: impl Into<Endpoint>,
    target: impl Into<Endpoint>,
    options: ConnectOptions,
) -> Result<&Connection> {
    let source = source.into();
    let target = target.into();
    let source_dim = ns.endpoint_kind(&source)?.dimensionality();
    let target_dim = ns.endpoint_kind(&target)?.dimensionality();
    let contracted = options.contract_dimensions.as_ref().map_or(0, Vec::len);
    check_contraction_count(source_dim, target_dim, contracted)?;

    ns.connect(source, target, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionKind;
    use crate::steps::{Boost, Field, GaussInput, Node, Scalar, ScalarMultiplication};
    use crate::weights::WeightPattern;
    use std::sync::{Arc, Mutex};

    fn field(ns: &mut NeuralStructure, name: &str, sizes: &[usize]) -> StepId {
        ns.create_named(name, Field::from_sizes(sizes).unwrap())
    }

    #[test]
    fn test_unique_names() {
        let mut ns = NeuralStructure::new();
        let a = ns.create(Node::new());
        let b = ns.create(Node::new());
        let c = ns.create(Node::new());
        assert_eq!(ns.step(a).unwrap().name(), "Neural Node");
        assert_eq!(ns.step(b).unwrap().name(), "Neural Node 2");
        assert_eq!(ns.step(c).unwrap().name(), "Neural Node 3");

        // Counters are per structure
        let mut other = NeuralStructure::new();
        let d = other.create(Node::new());
        assert_eq!(other.step(d).unwrap().name(), "Neural Node");
    }

    #[test]
    fn test_unique_name_skips_taken() {
        let mut ns = NeuralStructure::new();
        ns.add_step(Step::new("F 2", Field::from_sizes(&[5]).unwrap())).unwrap();
        field(&mut ns, "F", &[5]);
        let third = field(&mut ns, "F", &[5]);
        assert_eq!(ns.step(third).unwrap().name(), "F 3");
    }

    #[test]
    fn test_duplicate_add_step() {
        let mut ns = NeuralStructure::new();
        ns.add_step(Step::new("u", Node::new())).unwrap();
        let err = ns.add_step(Step::new("u", Node::new())).unwrap_err();
        assert!(matches!(err, DynfieldError::DuplicateStep(ref n) if n == "u"));
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.connections_into_steps().len(), 1);

        // add_step seeds the counter so create does not collide
        let id = ns.create_named("u", Node::new());
        assert_eq!(ns.step(id).unwrap().name(), "u 2");
    }

    #[test]
    fn test_field_to_node_contracts_all_axes() {
        let mut ns = NeuralStructure::new();
        let f = field(&mut ns, "F", &[11, 11]);
        let n = ns.create(Node::new());
        let conn = ns.connect(f, n, ConnectOptions::new()).unwrap();
        assert!(conn.is_synaptic());
        assert_eq!(conn.contract_dimensions, Some(vec![0, 1]));
        assert_eq!(conn.activation_function(), Some(ActivationFunction::sigmoid(100.0)));
    }

    #[test]
    fn test_array_kernel_becomes_custom_pattern() {
        let mut ns = NeuralStructure::new();
        let a = ns.create(Boost::new(1.0));
        let b = field(&mut ns, "F", &[3]);
        let conn = ns
            .connect(a, b, ConnectOptions::new().kernel(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert!(conn.is_synaptic());
        assert_eq!(
            conn.kernel_weights(),
            Some(&Weights::Pattern(WeightPattern::custom(vec![1.0, 2.0, 3.0])))
        );
        // Boost has no activation function of its own
        assert_eq!(conn.activation_function(), Some(ActivationFunction::broad_sigmoid()));
    }

    #[test]
    fn test_non_dynamic_without_weights_is_direct() {
        let mut ns = NeuralStructure::new();
        let a = ns.create(Scalar::new(2.0));
        let b = ns.create(ScalarMultiplication::new(vec![]));
        let conn = ns.connect(a, b, ConnectOptions::new()).unwrap();
        assert_eq!(conn.kind, ConnectionKind::Direct);
        assert_eq!(conn.name, "Direct Connection");
    }

    #[test]
    fn test_connect_registers_new_steps() {
        let mut ns = NeuralStructure::new();
        let input = Step::new("stimulus", GaussInput::from_sizes(&[21]).unwrap());
        let target = Step::new("F", Field::from_sizes(&[21]).unwrap());
        ns.connect(input, target, ConnectOptions::new()).unwrap();
        assert_eq!(ns.len(), 2);
        let f = ns.get_step_index_by_name("F").unwrap();
        assert_eq!(ns.input_steps(f), vec![ns.get_step_index_by_name("stimulus").unwrap()]);
        assert!(ns.get_connection_by_step_names("stimulus", "F").is_ok());
        assert!(matches!(
            ns.get_connection_by_step_names("F", "stimulus"),
            Err(DynfieldError::NotFound(_))
        ));
    }

    #[test]
    fn test_connect_rejects_bad_input_without_mutation() {
        let mut ns = NeuralStructure::new();
        let f = field(&mut ns, "F", &[11, 11]);
        let n = ns.create(Node::new());

        assert!(ns.connect(StepId(17), n, ConnectOptions::new()).is_err());
        assert!(ns.connect(f, n, ConnectOptions::new().contract(vec![2])).is_err());
        assert!(ns.connect(f, n, ConnectOptions::new().contract(vec![0, 0])).is_err());
        let err = ns
            .connect(Step::new("F", Node::new()), n, ConnectOptions::new())
            .unwrap_err();
        assert!(matches!(err, DynfieldError::DuplicateStep(_)));

        assert_eq!(ns.len(), 2);
        assert_eq!(ns.connections().count(), 0);
    }

    #[test]
    fn test_top_level_connect_requires_contractions() {
        let mut ns = NeuralStructure::new();
        let f = field(&mut ns, "F", &[11, 11, 5]);
        let g = field(&mut ns, "G", &[11]);

        let err = connect(&mut ns, f, g, ConnectOptions::new().contract(vec![0])).unwrap_err();
        match err {
            DynfieldError::ContractionMismatch { source_dim, target_dim, required } => {
                assert_eq!((source_dim, target_dim, required), (3, 1, 2));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let conn = connect(&mut ns, f, g, ConnectOptions::new().contract(vec![1, 2])).unwrap();
        assert_eq!(conn.contract_dimensions, Some(vec![1, 2]));
    }

    #[test]
    fn test_connect_checked_counts_inferred_contraction() {
        let mut ns = NeuralStructure::new();
        let a = field(&mut ns, "A", &[11, 11]);
        let b = field(&mut ns, "B", &[11]);
        let n = ns.create(Node::new());

        let err = ns.connect_checked(a, b, ConnectOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            DynfieldError::ContractionMismatch { source_dim: 2, target_dim: 1, required: 1 }
        ));
        assert_eq!(ns.connections().count(), 0);

        // Field to Node contracts everything on its own
        let conn = ns.connect_checked(a, n, ConnectOptions::new()).unwrap();
        assert_eq!(conn.contract_dimensions, Some(vec![0, 1]));
        let conn = ns.connect_checked(a, b, ConnectOptions::new().contract(vec![1])).unwrap();
        assert_eq!(conn.contract_dimensions, Some(vec![1]));
    }

    #[test]
    fn test_observers() {
        let mut ns = NeuralStructure::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        ns.register_add_step_observer(move |id, step| {
            s.lock().unwrap().push(format!("step {} {}", id.index(), step.name()))
        });
        let s = Arc::clone(&seen);
        ns.register_add_connection_observer(move |c| {
            s.lock().unwrap().push(format!("conn {}", c.name))
        });

        let a = ns.create(Node::new());
        let b = ns.create(Node::new());
        ns.connect(a, b, ConnectOptions::new()).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["step 0 Neural Node", "step 1 Neural Node 2", "conn Synaptic Connection"]
        );
    }

    #[test]
    fn test_rename_step() {
        let mut ns = NeuralStructure::new();
        let f = field(&mut ns, "F", &[5]);
        field(&mut ns, "G", &[5]);

        let renamed = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&renamed);
        ns.step_mut(f)
            .unwrap()
            .register_observer(move |s, prop| r.lock().unwrap().push((s.name().to_string(), prop.to_string())));

        assert!(matches!(ns.rename_step(f, "G"), Err(DynfieldError::DuplicateStep(_))));
        ns.rename_step(f, "H").unwrap();
        assert_eq!(ns.get_step_index_by_name("H").unwrap(), f);
        assert!(ns.get_step_by_name("F").is_err());
        assert_eq!(*renamed.lock().unwrap(), vec![("H".to_string(), "name".to_string())]);
    }

    #[test]
    fn test_field_stack() {
        let mut ns = NeuralStructure::new();
        field(&mut ns, "A", &[11, 11]);
        field(&mut ns, "B", &[11, 11]);
        field(&mut ns, "C", &[5, 5]);
        ns.create(Node::new());

        let stack = ns.create_field_stack("stack", &["A", "B"]).unwrap();
        assert_eq!(ns.step(stack).unwrap().dimensionality(), 3);

        assert!(ns.create_field_stack("bad", &["A", "C"]).is_err());
        assert!(ns.create_field_stack("bad", &["A", "Neural Node"]).is_err());
        assert!(ns.create_field_stack("bad", &[]).is_err());
    }

    #[test]
    fn test_set_param_through_structure() {
        let mut ns = NeuralStructure::new();
        let f = field(&mut ns, "F", &[5]);
        ns.set_param(f, "resting_level", ParamValue::Float(-3.0)).unwrap();
        assert_eq!(
            ns.step(f).unwrap().param("resting_level"),
            Some(ParamValue::Float(-3.0))
        );
        assert!(ns.set_param(StepId(9), "resting_level", ParamValue::Float(0.0)).is_err());
    }
}
