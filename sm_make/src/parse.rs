//! Typed extraction from the loosely-typed structured document.
//!
//! Every failure carries the structural index path of the node it points at,
//! so deeply nested mistakes stay localizable.

use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use sm_data::Position;

use crate::commands::{ChartIndex, ChartPoint, ChartRegion, PositionRef, Scalar, VarRef};
use crate::trace::{key, IndexPath, PathStep, Trace};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{trace}")]
pub struct ParseError {
    pub trace: Trace,
}

impl ParseError {
    pub fn new(path: IndexPath, message: impl Into<String>) -> Self {
        Self {
            trace: Trace::new(path, message),
        }
    }

    #[must_use]
    pub fn wrap(self, path: IndexPath, message: Option<String>) -> Self {
        Self {
            trace: self.trace.wrap(path, message),
        }
    }
}

pub(crate) fn yaml_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

fn type_error(expected: &str, got: &Value) -> ParseError {
    ParseError::new(
        Vec::new(),
        format!("expected {expected}, got '{}' instead", yaml_type_name(got)),
    )
}

pub(crate) fn mapping_get<'a>(map: &'a Mapping, name: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(name))
        .map(|(_, v)| v)
}

fn step_str(step: &PathStep) -> String {
    match step {
        PathStep::Key(k) => k.clone(),
        PathStep::Index(i) => i.to_string(),
    }
}

/// Verify that a key path exists and return what is there.
pub fn get<'a>(what: &'a Value, path: &[PathStep]) -> Result<&'a Value, ParseError> {
    let mut curr = what;
    for (ii, step) in path.iter().enumerate() {
        let next = match (step, curr) {
            (PathStep::Key(k), Value::Mapping(map)) => mapping_get(map, k),
            (PathStep::Index(i), Value::Sequence(seq)) => seq.get(*i),
            _ => None,
        };
        curr = match next {
            Some(value) => value,
            None => {
                return Err(ParseError::new(
                    path[..ii].to_vec(),
                    format!("key {} missing", step_str(step)),
                ))
            }
        };
    }
    Ok(curr)
}

pub fn check_int(what: &Value) -> Result<i64, ParseError> {
    if let Value::Number(n) = what {
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
    }
    Err(type_error("an integer", what))
}

pub fn check_str(what: &Value) -> Result<&str, ParseError> {
    match what {
        Value::String(s) => Ok(s),
        other => Err(type_error("a string", other)),
    }
}

pub fn check_sequence(what: &Value) -> Result<&[Value], ParseError> {
    match what {
        Value::Sequence(seq) => Ok(seq),
        other => Err(type_error("a list", other)),
    }
}

/// Check every element, tagging failures with their sequence index.
pub fn check_sequence_of<T>(
    seq: &[Value],
    parse_one: impl Fn(&Value) -> Result<T, ParseError>,
) -> Result<Vec<T>, ParseError> {
    seq.iter()
        .enumerate()
        .map(|(i, v)| parse_one(v).map_err(|e| e.wrap(vec![PathStep::Index(i)], None)))
        .collect()
}

pub fn parse_str<'a>(what: &'a Value, path: &[PathStep]) -> Result<&'a str, ParseError> {
    check_str(get(what, path)?).map_err(|e| e.wrap(path.to_vec(), None))
}

pub fn parse_list<'a>(what: &'a Value, path: &[PathStep]) -> Result<&'a [Value], ParseError> {
    check_sequence(get(what, path)?).map_err(|e| e.wrap(path.to_vec(), None))
}

static FRACTION_RE: OnceLock<Regex> = OnceLock::new();
static IDENT_RE: OnceLock<Regex> = OnceLock::new();

fn fraction_re() -> &'static Regex {
    // optional sign, then either an integer, a fraction, or an integer and a
    // fraction separated by REQUIRED whitespace; anything else is rejected
    // rather than guessed at
    FRACTION_RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<sign>[+-])?\s*(?:(?:(?P<whole>\d+)\s+)?(?P<num>\d+)\s*/\s*(?P<den>\d+)|(?P<int>\d+))\s*$")
            .expect("fraction pattern")
    })
}

fn ident_re() -> &'static Regex {
    IDENT_RE.get_or_init(|| Regex::new(r"^\w+$").expect("identifier pattern"))
}

fn parse_i64(digits: &str, context: &str) -> Result<i64, ParseError> {
    digits
        .parse()
        .map_err(|_| ParseError::new(Vec::new(), format!("number out of range in '{context}'")))
}

pub fn parse_fraction_str(s: &str) -> Result<Position, ParseError> {
    let caps = fraction_re()
        .captures(s)
        .ok_or_else(|| ParseError::new(Vec::new(), format!("invalid fraction '{s}'")))?;

    let magnitude = match (caps.name("int"), caps.name("num"), caps.name("den")) {
        (Some(int), _, _) => Position::from_integer(parse_i64(int.as_str(), s)?),
        (None, Some(num), Some(den)) => {
            let den = parse_i64(den.as_str(), s)?;
            if den == 0 {
                return Err(ParseError::new(
                    Vec::new(),
                    format!("zero denominator in fraction '{s}'"),
                ));
            }
            let whole = match caps.name("whole") {
                Some(w) => parse_i64(w.as_str(), s)?,
                None => 0,
            };
            Position::from_integer(whole) + Position::new(parse_i64(num.as_str(), s)?, den)
        }
        _ => return Err(ParseError::new(Vec::new(), format!("invalid fraction '{s}'"))),
    };

    let negative = caps.name("sign").is_some_and(|m| m.as_str() == "-");
    Ok(if negative { -magnitude } else { magnitude })
}

pub fn parse_fraction(what: &Value) -> Result<Position, ParseError> {
    match what {
        Value::Number(_) => Ok(Position::from_integer(check_int(what)?)),
        Value::String(s) => parse_fraction_str(s),
        other => Err(type_error("a fraction", other)),
    }
}

/// Scalar priority: integer, then fraction-shaped string, then plain string.
pub fn parse_scalar(what: &Value) -> Result<Scalar, ParseError> {
    match what {
        Value::Number(_) => Ok(Scalar::Int(check_int(what)?)),
        Value::String(s) => Ok(match parse_fraction_str(s) {
            Ok(frac) => Scalar::Frac(frac),
            Err(_) => Scalar::Str(s.clone()),
        }),
        other => Err(type_error("a scalar", other)),
    }
}

fn single_token<'a>(part: &'a str, context: &str) -> Result<&'a str, ParseError> {
    let token = part.trim();
    if ident_re().is_match(token) {
        Ok(token)
    } else {
        Err(ParseError::new(
            Vec::new(),
            format!("invalid chart point '{context}'"),
        ))
    }
}

/// Chart point grammar: `<index-or-identifier> [@ <base-identifier>] [~ <fraction>]`.
///
/// An identifier in index position becomes a deferred variable reference,
/// resolved at interpretation time; an omitted offset means beat 0.
pub fn parse_chart_point(what: &Value) -> Result<ChartPoint, ParseError> {
    let s = check_str(what)?;

    let (head, offset_text) = match s.split_once('~') {
        Some((head, offset)) => (head, Some(offset)),
        None => (s, None),
    };
    let (index_text, base_text) = match head.split_once('@') {
        Some((index, base)) => (index, Some(base)),
        None => (head, None),
    };

    let index_token = single_token(index_text, s)?;
    let chart_index = match index_token.parse::<usize>() {
        Ok(i) => ChartIndex::Literal(i),
        Err(_) => ChartIndex::Var(VarRef::new(index_token)),
    };

    let base = match base_text {
        Some(b) => Some(VarRef::new(single_token(b, s)?)),
        None => None,
    };

    let offset = match offset_text {
        None => PositionRef::Literal(Position::from_integer(0)),
        Some(o) => match parse_fraction_str(o) {
            Ok(frac) => PositionRef::Literal(frac),
            Err(_) => PositionRef::Var(VarRef::new(single_token(o, s)?)),
        },
    };

    Ok(ChartPoint {
        chart_index,
        base,
        offset,
    })
}

/// A position literal, or an identifier deferred to interpretation time.
pub fn parse_position_ref(what: &Value) -> Result<PositionRef, ParseError> {
    match what {
        Value::String(s) => match parse_fraction_str(s) {
            Ok(frac) => Ok(PositionRef::Literal(frac)),
            Err(e) => {
                let token = s.trim();
                if ident_re().is_match(token) {
                    Ok(PositionRef::Var(VarRef::new(token)))
                } else {
                    Err(e)
                }
            }
        },
        other => Ok(PositionRef::Literal(parse_fraction(other)?)),
    }
}

/// Chart region: a `src` chart point plus a `len` length.
pub fn parse_chart_region(what: &Value) -> Result<ChartRegion, ParseError> {
    let start =
        parse_chart_point(get(what, &[key("src")])?).map_err(|e| e.wrap(vec![key("src")], None))?;
    let length = parse_position_ref(get(what, &[key("len")])?)
        .map_err(|e| e.wrap(vec![key("len")], None))?;
    Ok(ChartRegion { start, length })
}
