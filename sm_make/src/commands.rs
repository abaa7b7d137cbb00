//! Command data structures.

use std::fmt;
use std::rc::Rc;

use serde_yaml::Value;
use sm_data::{OverlayMode, Position};

use crate::manager::Manager;

/// Reference to a context-defined variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub name: String,
}

impl VarRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Int(i64),
    Frac(Position),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Frac(r) => write!(f, "{r}"),
            Scalar::Str(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarValue {
    Single(Scalar),
    List(Vec<Scalar>),
}

/// A chart index that may still be a variable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartIndex {
    Literal(usize),
    Var(VarRef),
}

/// A position that may still be a variable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionRef {
    Literal(Position),
    Var(VarRef),
}

/// A point within a given chart of an entire simfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPoint {
    pub chart_index: ChartIndex,
    pub base: Option<VarRef>,
    pub offset: PositionRef,
}

/// Span variant of [`ChartPoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRegion {
    pub start: ChartPoint,
    pub length: PositionRef,
}

/// Copy a note slice into other places in the simfile.
#[derive(Debug, Clone, PartialEq)]
pub struct Copy {
    pub targets: Vec<ChartPoint>,
    pub source: ChartRegion,
    pub overlay_mode: OverlayMode,
}

/// Arbitrary directive for the command runner.
#[derive(Debug, Clone, PartialEq)]
pub struct Pragma {
    pub name: String,
    pub data: Option<PragmaData>,
}

/// Callable invoked by the `callable` pragma. Only constructible in code;
/// no document can produce one. A deliberate debug/test escape hatch and a
/// security hazard anywhere near untrusted input.
pub type PragmaFn = Rc<dyn Fn(&Manager)>;

#[derive(Clone)]
pub enum PragmaData {
    Value(Value),
    Callable(PragmaFn),
}

impl fmt::Debug for PragmaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PragmaData::Value(v) => f.debug_tuple("Value").field(v).finish(),
            PragmaData::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl PartialEq for PragmaData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PragmaData::Value(a), PragmaData::Value(b)) => a == b,
            (PragmaData::Callable(a), PragmaData::Callable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Sequence of commands to execute in a new scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub commands: Vec<Command>,
}

/// Function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub name: String,
    pub body: Group,
}

/// Function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
}

/// Variable definition (untyped).
#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub name: String,
    pub value: VarValue,
}

/// Indexed loop construct.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub name: String,
    pub values: Vec<Scalar>,
    pub body: Group,
}

/// Closed set of commands the interpreter understands; the match in
/// [`Manager::run`] is exhaustive by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Copy(Copy),
    Pragma(Pragma),
    Group(Group),
    Def(Def),
    Call(Call),
    Let(Let),
    For(For),
}

impl Command {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Command::Copy(_) => "Copy",
            Command::Pragma(_) => "Pragma",
            Command::Group(_) => "Group",
            Command::Def(_) => "Def",
            Command::Call(_) => "Call",
            Command::Let(_) => "Let",
            Command::For(_) => "For",
        }
    }
}
