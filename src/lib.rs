//! # Dynfield - DFT Architecture Graph
//!
//! Describes Dynamic Field Theory networks as a graph of steps (fields,
//! nodes, inputs) joined by weighted connections, and patches a running
//! simulation in place when the architecture file changes.
//!
//! ## Core Components
//!
//! - **Steps**: Field, Node and the input family, each with a fixed list of
//!   named parameters and change observers
//! - **Weight patterns**: Gauss, Sum, Repeat, RepeatedValue, Custom, plus
//!   kernel range math and the named `stabilized` kernel
//! - **NeuralStructure**: the graph; unique naming and connection inference
//! - **Architecture files**: declarative `.dfa` sources
//! - **Hot reload**: diff a freshly parsed version against the live one and
//!   push the changed parameters into the simulator
//!
//! The numeric simulator is not part of this crate; it plugs in through the
//! [`Simulator`] trait.
//!
//! ## Example
//!
//! ```ignore
//! use dynfield::{ConnectOptions, Field, NeuralStructure, Node};
//!
//! let mut ns = NeuralStructure::new();
//! let field = ns.create(Field::from_sizes(&[51, 51])?);
//! let node = ns.create(Node::new());
//!
//! // Field -> Node contracts every field axis
//! ns.connect(field, node, ConnectOptions::new().kernel(3.0))?;
//! ```

// Leaf types
pub mod activation;
pub mod dimension;
pub mod tensor;
pub use activation::ActivationFunction;
pub use dimension::{dimensions_from_sizes, shape_from_list_of_dimensions, Dimension};
pub use tensor::Tensor;

// Weight patterns and kernel math
pub mod weights;
pub use weights::{
    compute_kernel_range, named_kernel, stabilized_kernel, GaussPattern, KernelRange,
    RepeatPattern, SumPattern, Truncation, WeightPattern, Weights,
};

// Steps
pub mod steps;
pub use steps::{
    Boost, ColorSpace, CustomInput, Field, FieldStack, GaussInput, Image, NoiseInput, Node,
    ParamValue, RateMatrixToSpaceCode, Scalar, ScalarMultiplication, Step, StepId, StepKind,
    StepParameters, TimedBoost, TimedCustomInput, TimedGate,
};

// Graph
pub mod connection;
pub mod structure;
pub use connection::{Connection, ConnectionKind, NormalizationType, SynapticParams};
pub use structure::{connect, ConnectOptions, Endpoint, NeuralStructure};

// Process-wide default structure
pub mod shared;
pub use shared::SharedStructure;

// Architecture files
pub mod ir;
pub use ir::{parse_architecture, Architecture, ArchitectureParser, ParseError, ParseMode};

// Hot reload
pub mod reload;
pub use reload::{
    diff, merge_source, ArchitectureMonitor, ChangeSet, NullSimulator, ReloadEvent,
    ReloadableArchitecture, Simulator,
};

pub mod snapshot;
pub use snapshot::ArchitectureSnapshot;

// Configuration
pub mod config;
pub use config::ArchConfig;

// Error types
mod error;
pub use error::{DynfieldError, Result};

// Validation utilities
pub mod validate;
pub use validate::{
    validate_directory, validate_file, ValidationError, ValidationResult, ValidationSummary,
};
