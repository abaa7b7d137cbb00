//! Turns a structured document into command trees.

use serde_yaml::{Mapping, Value};

use sm_data::OverlayMode;

use crate::commands::{self, Command, Group, Pragma, PragmaData};
use crate::parse::{self, ParseError};
use crate::trace::{index, key};

/// Parse a single command node.
///
/// Dispatch: mappings by their first recognized key, strings as the inline
/// `name % arg % arg` form, sequences as implicit groups.
pub fn parse_command(raw: &Value) -> Result<Command, ParseError> {
    match raw {
        Value::Mapping(map) => parse_mapping(raw, map),
        Value::String(s) => parse_inline(s),
        Value::Sequence(seq) => Ok(Command::Group(parse_group(seq)?)),
        other => Err(ParseError::new(
            Vec::new(),
            format!(
                "unknown type of command: '{}'",
                parse::yaml_type_name(other)
            ),
        )),
    }
}

/// Parse a whole document (a sequence of command nodes).
pub fn parse_commands(raw: &Value) -> Result<Vec<Command>, ParseError> {
    let seq = parse::check_sequence(raw)?;
    Ok(parse_group(seq)?.commands)
}

fn parse_group(seq: &[Value]) -> Result<Group, ParseError> {
    let mut commands = Vec::new();
    for (i, raw) in seq.iter().enumerate() {
        commands.push(parse_command(raw).map_err(|e| e.wrap(vec![index(i)], None))?);
    }
    Ok(Group { commands })
}

fn has(map: &Mapping, name: &str) -> bool {
    parse::mapping_get(map, name).is_some()
}

fn parse_mapping(raw: &Value, map: &Mapping) -> Result<Command, ParseError> {
    if has(map, "copy") {
        return parse_copy(raw)
            .map(Command::Copy)
            .map_err(|e| e.wrap(Vec::new(), Some("failed to parse copy command".to_string())));
    }
    if has(map, "pragma") {
        return parse_pragma(raw)
            .map(Command::Pragma)
            .map_err(|e| e.wrap(Vec::new(), Some("failed to parse pragma command".to_string())));
    }
    if has(map, "def") {
        return parse_def(raw)
            .map(Command::Def)
            .map_err(|e| e.wrap(Vec::new(), Some("failed to parse def command".to_string())));
    }
    if has(map, "call") {
        let name = parse::parse_str(raw, &[key("call")])?;
        return Ok(Command::Call(commands::Call {
            name: name.to_string(),
        }));
    }
    if has(map, "let") {
        return parse_let(raw)
            .map(Command::Let)
            .map_err(|e| e.wrap(Vec::new(), Some("failed to parse let command".to_string())));
    }
    if has(map, "for") {
        return parse_for(raw)
            .map(Command::For)
            .map_err(|e| e.wrap(Vec::new(), Some("failed to parse for command".to_string())));
    }

    let keys: Vec<&str> = map.iter().filter_map(|(k, _)| k.as_str()).collect();
    Err(ParseError::new(
        Vec::new(),
        format!("unknown complex command with keys {keys:?}"),
    ))
}

fn parse_overlay_mode(name: &str) -> Result<OverlayMode, ParseError> {
    match name.to_lowercase().as_str() {
        "keep_self" => Ok(OverlayMode::KeepSelf),
        "keep_other" => Ok(OverlayMode::KeepOther),
        "raise" => Ok(OverlayMode::Raise),
        _ => Err(ParseError::new(
            Vec::new(),
            format!("unknown overlay mode '{name}'"),
        )),
    }
}

fn parse_copy(raw: &Value) -> Result<commands::Copy, ParseError> {
    let targets_raw = parse::parse_list(raw, &[key("dest")])?;
    let mut targets = Vec::new();
    for (i, t) in targets_raw.iter().enumerate() {
        targets.push(
            parse::parse_chart_point(t).map_err(|e| e.wrap(vec![key("dest"), index(i)], None))?,
        );
    }
    let source = parse::parse_chart_region(raw)?;
    let overlay_mode = match parse::get(raw, &[key("mode")]) {
        Ok(v) => {
            let name = parse::check_str(v).map_err(|e| e.wrap(vec![key("mode")], None))?;
            parse_overlay_mode(name).map_err(|e| e.wrap(vec![key("mode")], None))?
        }
        // collision handling defaults to overwriting with the copied notes
        Err(_) => OverlayMode::KeepOther,
    };
    Ok(commands::Copy {
        targets,
        source,
        overlay_mode,
    })
}

fn parse_pragma(raw: &Value) -> Result<Pragma, ParseError> {
    let name = parse::parse_str(raw, &[key("pragma")])?;
    let data = match parse::get(raw, &[key("data")]) {
        Ok(Value::Null) | Err(_) => None,
        Ok(v) => Some(PragmaData::Value(v.clone())),
    };
    Ok(Pragma {
        name: name.to_string(),
        data,
    })
}

fn parse_def(raw: &Value) -> Result<commands::Def, ParseError> {
    let name = parse::parse_str(raw, &[key("def")])?.to_string();
    let body_seq = parse::parse_list(raw, &[key("is")])?;
    let body = parse_group(body_seq).map_err(|e| {
        e.wrap(
            vec![key(format!("<def>{name}"))],
            Some("error in function definition".to_string()),
        )
    })?;
    Ok(commands::Def { name, body })
}

fn parse_let(raw: &Value) -> Result<commands::Let, ParseError> {
    let name = parse::parse_str(raw, &[key("let")])?.to_string();
    let raw_value = parse::get(raw, &[key("is")])?;
    let value = match raw_value {
        Value::Sequence(seq) => commands::VarValue::List(
            parse::check_sequence_of(seq, parse::parse_scalar)
                .map_err(|e| e.wrap(vec![key("is")], None))?,
        ),
        other => commands::VarValue::Single(
            parse::parse_scalar(other).map_err(|e| e.wrap(vec![key("is")], None))?,
        ),
    };
    Ok(commands::Let { name, value })
}

fn parse_for(raw: &Value) -> Result<commands::For, ParseError> {
    let name = parse::parse_str(raw, &[key("for")])?.to_string();
    let in_seq = parse::parse_list(raw, &[key("in")])?;
    let values = parse::check_sequence_of(in_seq, parse::parse_scalar)
        .map_err(|e| e.wrap(vec![key("in")], None))?;
    let body_seq = parse::parse_list(raw, &[key("do")])?;
    let body = parse_group(body_seq).map_err(|e| e.wrap(vec![key("do")], None))?;
    Ok(commands::For { name, values, body })
}

/// Inline command form: `name % arg % arg ...`. Only `pragma` is supported.
fn parse_inline(s: &str) -> Result<Command, ParseError> {
    let parts: Vec<&str> = s.split('%').map(str::trim).collect();
    let name = parts[0].to_lowercase();

    if name == "pragma" {
        if parts.len() < 2 {
            return Err(ParseError::new(
                Vec::new(),
                format!("pragma name missing: '{s}'"),
            ));
        }
        let data: Vec<Value> = parts[2..]
            .iter()
            .map(|arg| Value::String((*arg).to_string()))
            .collect();
        return Ok(Command::Pragma(Pragma {
            name: parts[1].to_string(),
            data: Some(PragmaData::Value(Value::Sequence(data))),
        }));
    }

    Err(ParseError::new(
        Vec::new(),
        format!("unknown string command: '{s}'"),
    ))
}
