//! Context manager and command runner.

use std::collections::BTreeMap;

use thiserror::Error;

use serde_yaml::Value;
use sm_data::{NoteData, Position};
use sm_simfile::{Chart, Simfile};

use crate::commands::{
    self, ChartIndex, ChartPoint, ChartRegion, Command, PositionRef, Pragma, PragmaData, Scalar,
    VarValue,
};
use crate::trace::{index, key, IndexPath, Trace};

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{trace}")]
pub struct CommandError {
    pub trace: Trace,
}

impl CommandError {
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

/// Value bound to a name in a scope frame: a variable, or a function
/// definition acting as one.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(VarValue),
    Function(commands::Def),
}

/// The equivalent of a stack frame for the manager.
#[derive(Debug, Clone, Default, PartialEq)]
struct Frame {
    variables: BTreeMap<String, Binding>,
}

/// Fully resolved chart location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedPoint {
    chart_index: usize,
    position: Position,
}

fn chart_at<'a>(
    simfile: &'a mut Simfile,
    chart_index: usize,
    what: &str,
) -> Result<&'a mut Chart, CommandError> {
    let count = simfile.charts.len();
    simfile.charts.get_mut(chart_index).ok_or_else(|| {
        CommandError::new(
            Vec::new(),
            format!("no {what} chart at index {chart_index} ({count} charts)"),
        )
    })
}

/// Tree-walking interpreter for [`Command`] trees.
///
/// Holds a stack of scope frames; lookups search innermost to outermost.
/// Execution is synchronous and depth-first, side effects land in document
/// order.
#[derive(Debug, Default)]
pub struct Manager {
    frames: Vec<Frame>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Search for a variable in the context frames, innermost first.
    pub fn lookup(&self, name: &str) -> Result<&Binding, CommandError> {
        for frame in self.frames.iter().rev() {
            if let Some(binding) = frame.variables.get(name) {
                return Ok(binding);
            }
        }
        Err(CommandError::new(
            Vec::new(),
            format!("'{name}' not defined"),
        ))
    }

    fn bind(&mut self, name: String, binding: Binding) {
        if let Some(frame) = self.frames.last_mut() {
            frame.variables.insert(name, binding);
        }
    }

    fn lookup_position(&self, name: &str) -> Result<Position, CommandError> {
        match self.lookup(name)? {
            Binding::Value(VarValue::Single(Scalar::Int(i))) => Ok(Position::from_integer(*i)),
            Binding::Value(VarValue::Single(Scalar::Frac(frac))) => Ok(*frac),
            _ => Err(CommandError::new(
                Vec::new(),
                format!("'{name}' is not a position"),
            )),
        }
    }

    fn lookup_chart_index(&self, name: &str) -> Result<usize, CommandError> {
        match self.lookup(name)? {
            Binding::Value(VarValue::Single(Scalar::Int(i))) if *i >= 0 => Ok(*i as usize),
            _ => Err(CommandError::new(
                Vec::new(),
                format!("'{name}' is not a chart index"),
            )),
        }
    }

    fn resolve_position(&self, what: &PositionRef) -> Result<Position, CommandError> {
        match what {
            PositionRef::Literal(position) => Ok(*position),
            PositionRef::Var(var) => self.lookup_position(&var.name),
        }
    }

    fn resolve_chart_index(&self, what: &ChartIndex) -> Result<usize, CommandError> {
        match what {
            ChartIndex::Literal(i) => Ok(*i),
            ChartIndex::Var(var) => self.lookup_chart_index(&var.name),
        }
    }

    /// Resolve all variable references in a [`ChartPoint`].
    fn reduce_chart_point(&self, point: &ChartPoint) -> Result<ResolvedPoint, CommandError> {
        let base = match &point.base {
            Some(var) => self.lookup_position(&var.name)?,
            None => Position::from_integer(0),
        };
        Ok(ResolvedPoint {
            chart_index: self.resolve_chart_index(&point.chart_index)?,
            position: base + self.resolve_position(&point.offset)?,
        })
    }

    fn reduce_chart_region(
        &self,
        region: &ChartRegion,
    ) -> Result<(ResolvedPoint, Position), CommandError> {
        Ok((
            self.reduce_chart_point(&region.start)?,
            self.resolve_position(&region.length)?,
        ))
    }

    fn run_copy(
        &mut self,
        copy: &commands::Copy,
        simfile: &mut Simfile,
    ) -> Result<(), CommandError> {
        let (start, length) = self.reduce_chart_region(&copy.source)?;
        let source: NoteData = chart_at(simfile, start.chart_index, "source")?
            .notes
            .slice(Some(start.position), Some(start.position + length));

        // Per-target failures are collected, not fatal mid-loop; one bad
        // target must not stop the others from applying.
        let mut failures: Vec<(usize, CommandError)> = Vec::new();
        for (i, target) in copy.targets.iter().enumerate() {
            let result = self.reduce_chart_point(target).and_then(|dest| {
                let chart = chart_at(simfile, dest.chart_index, "target")?;
                chart.notes = chart
                    .notes
                    .overlay(
                        &source.shift(dest.position - start.position),
                        copy.overlay_mode,
                    )
                    .map_err(|e| CommandError::new(Vec::new(), e.to_string()))?;
                Ok(())
            });
            if let Err(e) = result {
                failures.push((i, e));
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => {
                let (i, e) = failures.remove(0);
                Err(e.wrap(vec![index(i)], None))
            }
            n => {
                let total = copy.targets.len();
                let mut message = format!("{n} of {total} targets failed");
                for (i, e) in failures {
                    message.push_str(&format!("\n[{i}]: {e}"));
                }
                Err(CommandError::new(Vec::new(), message))
            }
        }
    }

    fn run_pragma(&mut self, pragma: &Pragma) -> Result<(), CommandError> {
        match pragma.name.as_str() {
            "echo" => {
                log::info!("{}", render_data(pragma.data.as_ref()));
                Ok(())
            }
            "vars" => {
                if let Some(frame) = self.frames.last() {
                    for (name, value) in &frame.variables {
                        log::info!("'{name}' = {value:?}");
                    }
                }
                Ok(())
            }
            "raise" => Err(CommandError::new(
                Vec::new(),
                format!(
                    "unconditional raise via pragma: {}",
                    render_data(pragma.data.as_ref())
                ),
            )),
            "callable" => match &pragma.data {
                // used by tests for internal state checks; see PragmaFn
                Some(PragmaData::Callable(call)) => {
                    call(self);
                    Ok(())
                }
                _ => Err(CommandError::new(
                    Vec::new(),
                    "callable pragma requires an embedded callable",
                )),
            },
            other => Err(CommandError::new(
                Vec::new(),
                format!("unknown pragma '{other}'"),
            )),
        }
    }

    fn run_group(
        &mut self,
        group: &commands::Group,
        simfile: &mut Simfile,
    ) -> Result<(), CommandError> {
        self.frames.push(Frame::default());
        let result = self.run_many(&group.commands, simfile);
        // scope cleanup is unconditional
        self.frames.pop();
        result
    }

    fn run_def(&mut self, def: &commands::Def) -> Result<(), CommandError> {
        self.bind(def.name.clone(), Binding::Function(def.clone()));
        Ok(())
    }

    fn run_call(
        &mut self,
        call: &commands::Call,
        simfile: &mut Simfile,
    ) -> Result<(), CommandError> {
        let binding = self.lookup(&call.name).map_err(|_| {
            CommandError::new(
                vec![key("Call")],
                format!("function '{}' does not exist", call.name),
            )
        })?;
        let def = match binding {
            Binding::Function(def) => def.clone(),
            Binding::Value(_) => {
                return Err(CommandError::new(
                    vec![key("Call")],
                    format!("variable '{}' is not a function", call.name),
                ))
            }
        };
        self.run_group(&def.body, simfile).map_err(|e| {
            e.wrap(
                vec![key(format!("<fn>{}", call.name))],
                Some("error during function call".to_string()),
            )
        })
    }

    fn run_let(&mut self, let_cmd: &commands::Let) -> Result<(), CommandError> {
        self.bind(
            let_cmd.name.clone(),
            Binding::Value(let_cmd.value.clone()),
        );
        Ok(())
    }

    fn run_for(
        &mut self,
        for_cmd: &commands::For,
        simfile: &mut Simfile,
    ) -> Result<(), CommandError> {
        for (i, value) in for_cmd.values.iter().enumerate() {
            // Each iteration gets its own scope; referencing dangling values
            // from the previous iteration is forbidden.
            self.frames.push(Frame::default());
            self.bind(
                for_cmd.name.clone(),
                Binding::Value(VarValue::Single(value.clone())),
            );
            let result = self.run_group(&for_cmd.body, simfile);
            self.frames.pop();
            result.map_err(|e| {
                e.wrap(
                    vec![index(i)],
                    Some(format!("'{}' := {}", for_cmd.name, value)),
                )
            })?;
        }
        Ok(())
    }

    /// Run a command on the simfile, potentially modifying it in place.
    pub fn run(&mut self, command: &Command, simfile: &mut Simfile) -> Result<(), CommandError> {
        let result = match command {
            Command::Copy(c) => self.run_copy(c, simfile),
            Command::Pragma(c) => self.run_pragma(c),
            Command::Group(c) => self.run_group(c, simfile),
            Command::Def(c) => self.run_def(c),
            Command::Call(c) => self.run_call(c, simfile),
            Command::Let(c) => self.run_let(c),
            Command::For(c) => self.run_for(c, simfile),
        };
        match command {
            // Group is purely structural; Call supplies its own context
            Command::Group(_) | Command::Call(_) => result,
            _ => result.map_err(|e| e.wrap(vec![key(command.type_name())], None)),
        }
    }

    /// Convenience function to run a stream of commands.
    pub fn run_many(
        &mut self,
        commands: &[Command],
        simfile: &mut Simfile,
    ) -> Result<(), CommandError> {
        for (i, command) in commands.iter().enumerate() {
            self.run(command, simfile)
                .map_err(|e| e.wrap(vec![index(i)], None))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

fn render_data(data: Option<&PragmaData>) -> String {
    match data {
        None => "null".to_string(),
        Some(PragmaData::Callable(_)) => "<callable>".to_string(),
        Some(PragmaData::Value(value)) => render_value(value),
    }
}

fn render_value(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}
