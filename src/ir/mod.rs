//! Architecture files (.dfa)
//!
//! Declarative, line-oriented description of a neural structure. Parsing a
//! file always builds a fresh, independent [`NeuralStructure`]; the hot
//! reload engine diffs that against the live one.
//!
//! ## Syntax
//!
//! ```text
//! ; Comments start with semicolon
//!
//! .meta
//!     name    "scene_attention"
//!     version 2
//!
//! .config                         ; live-only, skipped on reload
//!     kernel_cutoff_factor  4
//!     circular_kernels      false
//!
//! .step field "F"
//!     dimensions          [51, 51, 11]
//!     resting_level       -5
//!     activation_function sigmoid(100)
//!     interaction_kernel  stabilized
//!
//! .step node "N"
//!     self_excitation 1.5
//!
//! .connect "F" -> "N"
//!     contract_dimensions [0, 1, 2]
//!     kernel_weights      3
//! ```
//!
//! Step keys are the parameter names of the step kind; values are parsed
//! according to the parameter's current type (see [`expr`]).

pub mod expr;

use crate::config::ArchConfig;
use crate::steps::{
    Boost, CustomInput, Field, FieldStack, GaussInput, Image, NoiseInput, Node, ParamValue,
    RateMatrixToSpaceCode, Scalar, ScalarMultiplication, Step, StepKind, TimedBoost,
    TimedCustomInput, TimedGate,
};
use crate::structure::{ConnectOptions, NeuralStructure};
use crate::tensor::Tensor;
use crate::weights::named_kernel;
use expr::{parse_expr, to_activation, to_param, to_weights, Expr};

/// Architecture file extension
pub const ARCHITECTURE_EXTENSION: &str = "dfa";

/// What the parsed source is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// First load: `.config` is applied
    Initial,
    /// Hot reload: live-only `.config` statements are skipped
    Reload,
}

/// Header information from `.meta`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchitectureMeta {
    pub name: Option<String>,
    pub version: u32,
}

/// Result of parsing an architecture file
#[derive(Debug)]
pub struct Architecture {
    pub meta: ArchitectureMeta,
    pub config: ArchConfig,
    pub structure: NeuralStructure,
}

/// Parse error
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Default step of a kind, as named in `.step <kind>`.
pub fn step_kind_from_name(kind: &str) -> Option<StepKind> {
    let kind = match kind.to_lowercase().replace('_', "").as_str() {
        "field" => Field::new(Vec::new()).into(),
        "node" => Node::new().into(),
        "boost" => Boost::new(0.0).into(),
        "timedboost" => TimedBoost::default().into(),
        "gaussinput" => GaussInput::new(Vec::new()).into(),
        "custominput" => CustomInput::new(Tensor::zeros(Vec::new())).into(),
        "noiseinput" => NoiseInput::new(Vec::new()).into(),
        "timedcustominput" => TimedCustomInput::new(Vec::new()).into(),
        "timedgate" => TimedGate::new(Vec::new()).into(),
        "image" => Image::new("").into(),
        "scalar" => Scalar::default().into(),
        "scalarmultiplication" => ScalarMultiplication::new(Vec::new()).into(),
        "ratematrixtospacecode" => RateMatrixToSpaceCode::default().into(),
        "fieldstack" => FieldStack::new(Vec::new(), Vec::new()).into(),
        _ => return None,
    };
    Some(kind)
}

struct PendingStep {
    step: Step,
    /// Kernel given by name, resolved once the dimensions are known
    named_kernel: Option<String>,
    line: usize,
}

struct PendingConnection {
    input: String,
    output: String,
    options: ConnectOptions,
    line: usize,
}

enum Section {
    None,
    Meta,
    Config,
    Skipped,
    Step(PendingStep),
    Connect(PendingConnection),
}

/// Architecture file parser
pub struct ArchitectureParser {
    mode: ParseMode,
    line_number: usize,
    meta: ArchitectureMeta,
    config: ArchConfig,
    structure: NeuralStructure,
    /// Connections are resolved after all steps exist
    connections: Vec<PendingConnection>,
}

impl ArchitectureParser {
    pub fn new(mode: ParseMode) -> Self {
        Self::with_config(mode, ArchConfig::default())
    }

    /// Start from an existing configuration (e.g. the live one on reload).
    pub fn with_config(mode: ParseMode, config: ArchConfig) -> Self {
        Self {
            mode,
            line_number: 0,
            meta: ArchitectureMeta {
                name: None,
                version: 1,
            },
            config,
            structure: NeuralStructure::new(),
            connections: Vec::new(),
        }
    }

    pub fn parse(mut self, source: &str) -> Result<Architecture, ParseError> {
        let mut section = Section::None;

        for (idx, line) in source.lines().enumerate() {
            self.line_number = idx + 1;
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('.') {
                self.finish_section(std::mem::replace(&mut section, Section::None))?;
                section = self.open_section(line)?;
                continue;
            }

            match &mut section {
                Section::None => {
                    return Err(self.error(format!("statement outside of a section: {}", line)))
                }
                Section::Meta => self.parse_meta(line)?,
                Section::Config => {
                    let (key, value) = split_key_value(line);
                    self.config
                        .set(key, value)
                        .map_err(|e| self.error(e.to_string()))?;
                }
                Section::Skipped => {}
                Section::Step(pending) => {
                    let line_number = self.line_number;
                    parse_step_line(pending, line).map_err(|message| ParseError {
                        line: line_number,
                        message,
                    })?;
                }
                Section::Connect(pending) => {
                    let line_number = self.line_number;
                    parse_connect_line(&mut pending.options, line).map_err(|message| ParseError {
                        line: line_number,
                        message,
                    })?;
                }
            }
        }
        self.finish_section(section)?;

        for pending in std::mem::take(&mut self.connections) {
            self.resolve_connection(pending)?;
        }

        Ok(Architecture {
            meta: self.meta,
            config: self.config,
            structure: self.structure,
        })
    }

    fn open_section(&mut self, line: &str) -> Result<Section, ParseError> {
        let (directive, rest) = split_key_value(line);
        match directive.to_lowercase().as_str() {
            ".meta" => Ok(Section::Meta),
            ".config" => match self.mode {
                ParseMode::Initial => Ok(Section::Config),
                ParseMode::Reload => {
                    log::debug!("Skipping .config section on reload (line {})", self.line_number);
                    Ok(Section::Skipped)
                }
            },
            ".step" => {
                let (kind_name, name) = split_key_value(rest);
                let kind = step_kind_from_name(kind_name)
                    .ok_or_else(|| self.error(format!("unknown step kind: {}", kind_name)))?;
                let name = parse_quoted(name)
                    .ok_or_else(|| self.error(format!("expected a quoted step name, got: {}", name)))?;
                if self.structure.contains_name(&name) {
                    return Err(self.error(format!("step \"{}\" is defined twice", name)));
                }
                Ok(Section::Step(PendingStep {
                    step: Step::new(name, kind),
                    named_kernel: None,
                    line: self.line_number,
                }))
            }
            ".connect" => {
                let (input, output) = rest
                    .split_once("->")
                    .ok_or_else(|| self.error(format!("expected \"<input>\" -> \"<output>\", got: {}", rest)))?;
                let input = parse_quoted(input.trim())
                    .ok_or_else(|| self.error(format!("expected a quoted step name, got: {}", input.trim())))?;
                let output = parse_quoted(output.trim())
                    .ok_or_else(|| self.error(format!("expected a quoted step name, got: {}", output.trim())))?;
                Ok(Section::Connect(PendingConnection {
                    input,
                    output,
                    options: ConnectOptions::new(),
                    line: self.line_number,
                }))
            }
            _ => {
                log::debug!("Skipping unknown section {} (line {})", directive, self.line_number);
                Ok(Section::Skipped)
            }
        }
    }

    fn finish_section(&mut self, section: Section) -> Result<(), ParseError> {
        match section {
            Section::Step(pending) => self.finish_step(pending),
            Section::Connect(pending) => {
                self.connections.push(pending);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn finish_step(&mut self, mut pending: PendingStep) -> Result<(), ParseError> {
        let line = pending.line;
        if let Some(name) = pending.named_kernel.take() {
            let shape = match pending.step.kind() {
                StepKind::Field(field) => field.shape(),
                other => {
                    return Err(ParseError {
                        line,
                        message: format!("{} has no interaction kernel", other.kind_name()),
                    })
                }
            };
            let truncation = self.config.truncation(&shape);
            let kernel = named_kernel(&name, shape.len(), Some(&truncation)).map_err(|e| ParseError {
                line,
                message: e.to_string(),
            })?;
            pending
                .step
                .set_param("interaction_kernel", ParamValue::Kernel(Some(kernel)))
                .map_err(|e| ParseError {
                    line,
                    message: e.to_string(),
                })?;
        }
        self.structure.add_step(pending.step).map_err(|e| ParseError {
            line,
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn resolve_connection(&mut self, pending: PendingConnection) -> Result<(), ParseError> {
        let line = pending.line;
        let to_error = |e: crate::error::DynfieldError| ParseError {
            line,
            message: e.to_string(),
        };
        let input = self.structure.get_step_index_by_name(&pending.input).map_err(to_error)?;
        let output = self.structure.get_step_index_by_name(&pending.output).map_err(to_error)?;
        self.structure
            .connect_checked(input, output, pending.options)
            .map_err(to_error)?;
        Ok(())
    }

    fn parse_meta(&mut self, line: &str) -> Result<(), ParseError> {
        let (key, value) = split_key_value(line);
        match key.to_lowercase().as_str() {
            "name" => self.meta.name = Some(value.trim_matches('"').to_string()),
            "version" => {
                self.meta.version = value
                    .parse()
                    .map_err(|_| self.error(format!("Invalid version: {}", value)))?
            }
            _ => log::debug!("Ignoring unknown .meta key: {}", key),
        }
        Ok(())
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            line: self.line_number,
            message,
        }
    }
}

fn parse_step_line(pending: &mut PendingStep, line: &str) -> Result<(), String> {
    let (key, value) = split_key_value(line);
    let expr = parse_expr(value)?;

    let current = pending.step.param(key).ok_or_else(|| {
        format!("{} has no parameter '{}'", pending.step.kind_name(), key)
    })?;

    if let (ParamValue::Kernel(_), Expr::Ident(name)) = (&current, &expr) {
        if !expr.is_none() {
            pending.named_kernel = Some(name.clone());
            return Ok(());
        }
    }
    if key == "interaction_kernel" {
        pending.named_kernel = None;
    }

    let value = to_param(&expr, &current).map_err(|e| format!("{}: {}", key, e))?;
    pending.step.set_param(key, value).map_err(|e| e.to_string())
}

fn parse_connect_line(options: &mut ConnectOptions, line: &str) -> Result<(), String> {
    let (key, value) = split_key_value(line);
    let expr = parse_expr(value)?;
    let optional = |f: fn(&Expr) -> Result<Vec<usize>, String>| -> Result<Option<Vec<usize>>, String> {
        if expr.is_none() {
            Ok(None)
        } else {
            f(&expr).map(Some)
        }
    };

    match key {
        "kernel_weights" => options.kernel_weights = (!expr.is_none()).then(|| to_weights(&expr)).transpose()?,
        "pointwise_weights" => {
            options.pointwise_weights = (!expr.is_none()).then(|| to_weights(&expr)).transpose()?
        }
        "activation_function" => options.activation_function = Some(to_activation(&expr)?),
        "contract_dimensions" => options.contract_dimensions = optional(Expr::as_counts)?,
        "expand_dimensions" => options.expand_dimensions = optional(Expr::as_counts)?,
        "contraction_weights" => {
            options.contraction_weights = (!expr.is_none()).then(|| expr.as_tensor()).transpose()?
        }
        _ => return Err(format!("unknown connection key: {}", key)),
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            ';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn split_key_value(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

fn parse_quoted(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.to_string())
}

/// Parse an architecture file.
pub fn parse_architecture(source: &str, mode: ParseMode) -> Result<Architecture, ParseError> {
    ArchitectureParser::new(mode).parse(source)
}
