//! Computational steps
//!
//! A [`Step`] is one node of the architecture graph: a name, a few base
//! flags, and a variant payload ([`StepKind`]). All parameter writes after
//! construction go through [`Step::set_param`], which stores the value and
//! then notifies every registered observer in registration order.
//!
//! ## Variants
//!
//! | Kind | Static | Stateful | Dimensionality |
//! |------|--------|----------|----------------|
//! | Field | no | yes | len(dimensions) |
//! | Node | no | yes | 0 |
//! | Boost, TimedBoost | no | yes | 0 |
//! | GaussInput | yes | no | len(dimensions) |
//! | CustomInput | yes | no | rank(pattern) |
//! | NoiseInput, TimedCustomInput, TimedGate | no | no | len(dimensions) |
//! | Image | yes | no | 3 |
//! | Scalar | yes | no | 0 |
//! | ScalarMultiplication | no | no | len(shape) |
//! | RateMatrixToSpaceCode | no | no | 3 |
//! | FieldStack | no | yes | len(dimensions) + 1 |

mod kinds;
mod params;

pub use kinds::{
    Boost, CustomInput, Field, FieldStack, GaussInput, Image, NoiseInput, Node,
    RateMatrixToSpaceCode, Scalar, ScalarMultiplication, TimedBoost, TimedCustomInput, TimedGate,
};
pub use params::{ColorSpace, ParamValue, StepParameters};

use crate::activation::ActivationFunction;
use crate::error::Result;
use serde::Serialize;
use std::fmt;

/// Stable index of a step inside its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StepId(pub(crate) usize);

impl StepId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Change observer: called with the step and the name of the changed property.
pub type StepObserver = Box<dyn Fn(&Step, &str) + Send + Sync>;

/// Step variant payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StepKind {
    Field(Field),
    Node(Node),
    Boost(Boost),
    TimedBoost(TimedBoost),
    GaussInput(GaussInput),
    CustomInput(CustomInput),
    NoiseInput(NoiseInput),
    TimedCustomInput(TimedCustomInput),
    TimedGate(TimedGate),
    Image(Image),
    Scalar(Scalar),
    ScalarMultiplication(ScalarMultiplication),
    RateMatrixToSpaceCode(RateMatrixToSpaceCode),
    FieldStack(FieldStack),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            StepKind::Field($inner) => $body,
            StepKind::Node($inner) => $body,
            StepKind::Boost($inner) => $body,
            StepKind::TimedBoost($inner) => $body,
            StepKind::GaussInput($inner) => $body,
            StepKind::CustomInput($inner) => $body,
            StepKind::NoiseInput($inner) => $body,
            StepKind::TimedCustomInput($inner) => $body,
            StepKind::TimedGate($inner) => $body,
            StepKind::Image($inner) => $body,
            StepKind::Scalar($inner) => $body,
            StepKind::ScalarMultiplication($inner) => $body,
            StepKind::RateMatrixToSpaceCode($inner) => $body,
            StepKind::FieldStack($inner) => $body,
        }
    };
}

macro_rules! impl_from_kind {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for StepKind {
                fn from(kind: $variant) -> Self {
                    StepKind::$variant(kind)
                }
            }
        )*
    };
}

impl_from_kind!(
    Field,
    Node,
    Boost,
    TimedBoost,
    GaussInput,
    CustomInput,
    NoiseInput,
    TimedCustomInput,
    TimedGate,
    Image,
    Scalar,
    ScalarMultiplication,
    RateMatrixToSpaceCode,
    FieldStack,
);

impl StepKind {
    /// Kind name as written in architecture files.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Field(_) => "Field",
            Self::Node(_) => "Node",
            Self::Boost(_) => "Boost",
            Self::TimedBoost(_) => "TimedBoost",
            Self::GaussInput(_) => "GaussInput",
            Self::CustomInput(_) => "CustomInput",
            Self::NoiseInput(_) => "NoiseInput",
            Self::TimedCustomInput(_) => "TimedCustomInput",
            Self::TimedGate(_) => "TimedGate",
            Self::Image(_) => "Image",
            Self::Scalar(_) => "Scalar",
            Self::ScalarMultiplication(_) => "ScalarMultiplication",
            Self::RateMatrixToSpaceCode(_) => "RateMatrixToSpaceCode",
            Self::FieldStack(_) => "FieldStack",
        }
    }

    /// Name given to a step created without an explicit one.
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Field(_) => "Field",
            Self::Node(_) => "Neural Node",
            Self::Boost(_) | Self::TimedBoost(_) => "Boost",
            Self::GaussInput(_) => "GaussInput",
            Self::CustomInput(_) => "CustomInput",
            Self::NoiseInput(_) => "NoiseInput",
            Self::TimedCustomInput(_) => "TimedCustomInput",
            Self::TimedGate(_) => "TimedGate",
            Self::Image(_) => "Image",
            Self::Scalar(_) => "Scalar",
            Self::ScalarMultiplication(_) => "Scalar Multiplication",
            Self::RateMatrixToSpaceCode(_) => "Rate Matrix to Space Code",
            Self::FieldStack(_) => "FieldStack",
        }
    }

    /// Output computed once and held constant.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::GaussInput(_) | Self::CustomInput(_) | Self::Image(_) | Self::Scalar(_)
        )
    }

    /// Carries state between time steps.
    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            Self::Field(_) | Self::Node(_) | Self::Boost(_) | Self::TimedBoost(_) | Self::FieldStack(_)
        )
    }

    /// Field or node.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Field(_) | Self::Node(_))
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::Boost(_)
                | Self::TimedBoost(_)
                | Self::GaussInput(_)
                | Self::CustomInput(_)
                | Self::NoiseInput(_)
                | Self::TimedCustomInput(_)
                | Self::Image(_)
                | Self::Scalar(_)
        )
    }

    /// Named input slots the step reads from.
    pub fn default_inputs(&self) -> Vec<String> {
        match self {
            Self::RateMatrixToSpaceCode(_) => vec!["map".to_string(), "value".to_string()],
            _ => Vec::new(),
        }
    }

    /// Number of axes of the step's output.
    pub fn dimensionality(&self) -> usize {
        match self {
            Self::Field(f) => f.dimensions.len(),
            Self::GaussInput(g) => g.dimensions.len(),
            Self::CustomInput(c) => c.pattern.rank(),
            Self::NoiseInput(n) => n.dimensions.len(),
            Self::TimedCustomInput(t) => t.dimensions.len(),
            Self::TimedGate(t) => t.dimensions.len(),
            Self::ScalarMultiplication(s) => s.shape.len(),
            Self::FieldStack(s) => s.dimensions.len() + 1,
            Self::Image(_) | Self::RateMatrixToSpaceCode(_) => 3,
            Self::Node(_) | Self::Boost(_) | Self::TimedBoost(_) | Self::Scalar(_) => 0,
        }
    }

    /// Output nonlinearity of fields and nodes.
    pub fn activation_function(&self) -> Option<ActivationFunction> {
        match self {
            Self::Field(f) => Some(f.activation_function),
            Self::Node(n) => Some(n.activation_function),
            _ => None,
        }
    }
}

impl StepParameters for StepKind {
    fn params(&self) -> Vec<(&'static str, ParamValue)> {
        dispatch!(self, kind => kind.params())
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        dispatch!(self, kind => kind.set_param(name, value))
    }
}

/// A registered or to-be-registered computational step
pub struct Step {
    name: String,
    trainable: bool,
    assignable: bool,
    inputs: Vec<String>,
    kind: StepKind,
    observers: Vec<StepObserver>,
}

impl Step {
    pub fn new(name: impl Into<String>, kind: impl Into<StepKind>) -> Self {
        let kind = kind.into();
        Self {
            name: name.into(),
            trainable: false,
            assignable: false,
            inputs: kind.default_inputs(),
            kind,
            observers: Vec::new(),
        }
    }

    /// Step carrying the kind's default name.
    pub fn from_kind(kind: impl Into<StepKind>) -> Self {
        let kind = kind.into();
        Self::new(kind.default_name(), kind)
    }

    /// Trainable steps are always assignable.
    pub fn with_trainable(mut self, trainable: bool) -> Self {
        self.trainable = trainable;
        if trainable {
            self.assignable = true;
        }
        self
    }

    pub fn with_assignable(mut self, assignable: bool) -> Self {
        self.assignable = assignable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.kind_name()
    }

    pub fn is_static(&self) -> bool {
        self.kind.is_static()
    }

    pub fn is_stateful(&self) -> bool {
        self.kind.is_stateful()
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind.is_dynamic()
    }

    pub fn is_input(&self) -> bool {
        self.kind.is_input()
    }

    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    pub fn is_assignable(&self) -> bool {
        self.assignable
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn dimensionality(&self) -> usize {
        self.kind.dimensionality()
    }

    pub fn activation_function(&self) -> Option<ActivationFunction> {
        self.kind.activation_function()
    }

    pub fn register_observer(&mut self, observer: impl Fn(&Step, &str) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Base flags followed by the variant's parameters.
    pub fn params(&self) -> Vec<(&'static str, ParamValue)> {
        let mut params = vec![
            ("trainable", ParamValue::Bool(self.trainable)),
            ("assignable", ParamValue::Bool(self.assignable)),
        ];
        params.extend(self.kind.params());
        params
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        match name {
            "trainable" => Some(ParamValue::Bool(self.trainable)),
            "assignable" => Some(ParamValue::Bool(self.assignable)),
            _ => self.kind.param(name),
        }
    }

    /// Store a parameter, then notify observers.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "trainable" => {
                self.trainable = value.into_bool(name)?;
                self.notify("trainable");
                if self.trainable && !self.assignable {
                    self.assignable = true;
                    self.notify("assignable");
                }
            }
            "assignable" => {
                self.assignable = value.into_bool(name)?;
                self.notify("assignable");
            }
            _ => {
                self.kind.set_param(name, value)?;
                self.notify(name);
            }
        }
        Ok(())
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
        self.notify("name");
    }

    fn notify(&self, property: &str) {
        for observer in &self.observers {
            observer(self, property);
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("trainable", &self.trainable)
            .field("assignable", &self.assignable)
            .field("inputs", &self.inputs)
            .field("kind", &self.kind)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_default_names_and_capabilities() {
        let node = Step::from_kind(Node::new());
        assert_eq!(node.name(), "Neural Node");
        assert!(node.is_dynamic());
        assert!(node.is_stateful());
        assert!(!node.is_static());
        assert_eq!(node.dimensionality(), 0);

        let scalar = Step::from_kind(Scalar::default());
        assert!(scalar.is_static());
        assert!(scalar.is_input());

        let code = Step::from_kind(RateMatrixToSpaceCode::default());
        assert_eq!(code.name(), "Rate Matrix to Space Code");
        assert_eq!(code.inputs(), &["map".to_string(), "value".to_string()]);
        assert_eq!(code.dimensionality(), 3);

        assert_eq!(Step::from_kind(TimedBoost::default()).name(), "Boost");
    }

    #[test]
    fn test_observers_fire_in_order_after_store() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut step = Step::new("F", Field::from_sizes(&[11]).unwrap());

        for tag in ["first", "second"] {
            let log = Arc::clone(&log);
            step.register_observer(move |s, prop| {
                let value = s.param(prop);
                log.lock().unwrap().push((tag, prop.to_string(), value));
            });
        }

        step.set_param("resting_level", ParamValue::Float(-2.0)).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "first");
        assert_eq!(log[1].0, "second");
        // Observers see the new value
        assert_eq!(log[0].2, Some(ParamValue::Float(-2.0)));
    }

    #[test]
    fn test_failed_set_does_not_notify() {
        let count = Arc::new(Mutex::new(0));
        let mut step = Step::from_kind(Boost::new(1.0));
        let c = Arc::clone(&count);
        step.register_observer(move |_, _| *c.lock().unwrap() += 1);

        assert!(step.set_param("value", ParamValue::Bool(true)).is_err());
        assert!(step.set_param("missing", ParamValue::Float(1.0)).is_err());
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_mean_of_wrong_length_is_rejected_silently() {
        let count = Arc::new(Mutex::new(0));
        let mut step = Step::from_kind(GaussInput::from_sizes(&[11]).unwrap());
        let c = Arc::clone(&count);
        step.register_observer(move |_, _| *c.lock().unwrap() += 1);

        assert!(step.set_param("mean", ParamValue::Floats(vec![1.0, 2.0, 3.0])).is_err());
        assert_eq!(step.param("mean"), Some(ParamValue::Floats(vec![0.0])));
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_trainable_implies_assignable() {
        let step = Step::from_kind(Node::new()).with_trainable(true);
        assert!(step.is_assignable());

        let mut step = Step::from_kind(Node::new());
        let props = Arc::new(Mutex::new(Vec::new()));
        let p = Arc::clone(&props);
        step.register_observer(move |_, prop| p.lock().unwrap().push(prop.to_string()));
        step.set_param("trainable", ParamValue::Bool(true)).unwrap();
        assert!(step.is_assignable());
        assert_eq!(*props.lock().unwrap(), vec!["trainable", "assignable"]);
    }

    #[test]
    fn test_params_include_base_flags() {
        let step = Step::from_kind(Scalar::new(3.0));
        let names: Vec<&str> = step.params().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["trainable", "assignable", "value"]);
    }

    #[test]
    fn test_dimensionality_per_kind() {
        let field = Field::from_sizes(&[5, 5]).unwrap();
        let stack = FieldStack::new(vec!["a".into(), "b".into()], field.dimensions.clone());
        assert_eq!(StepKind::from(field).dimensionality(), 2);
        assert_eq!(StepKind::from(stack).dimensionality(), 3);
        assert_eq!(StepKind::from(CustomInput::new(vec![1.0, 2.0])).dimensionality(), 1);
        assert_eq!(StepKind::from(Image::new("x.png")).dimensionality(), 3);
    }
}
